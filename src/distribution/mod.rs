// src/distribution/mod.rs

//! Node.js distribution descriptors.
//!
//! [`platform`] detects the host OS/architecture; [`node`] turns a version and
//! a platform into a download URL, archive layout and expected executables.

pub mod node;
pub mod platform;

pub use node::{
    DEFAULT_URL_PATH_PATTERN, DEFAULT_URL_ROOT, DistributionDescriptor, DistributionResolver,
    executable_dir, node_executable, parse_node_version, script_executable,
};
pub use platform::{Arch, Os, Platform};
