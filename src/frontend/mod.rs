// src/frontend/mod.rs

//! Frontend project support.
//!
//! - [`manifest`] reads `package.json`.
//! - [`package_manager`] models npm, pnpm and yarn.
//! - [`tasks`] registers the install/build tasks for a project.
//! - [`actions`] implements what those tasks do.

pub mod actions;
pub mod manifest;
pub mod package_manager;
pub mod tasks;

pub use manifest::{MANIFEST_FILE_NAME, PackageManifest};
pub use package_manager::{PackageManagerKind, PackageManagerSpec};
pub use tasks::{
    ASSEMBLE_FRONTEND, CHECK_FRONTEND, CLEAN_FRONTEND, Collaborators, INSTALL_FRONTEND,
    INSTALL_NODE, PACKAGE_MANAGER_EXECUTABLE_FILE, PACKAGE_MANAGER_SPEC_FILE, PUBLISH_FRONTEND,
    RESOLVE_PACKAGE_MANAGER, frontend_tasks,
};
