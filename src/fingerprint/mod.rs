// src/fingerprint/mod.rs

//! Fingerprint engine.
//!
//! - [`spec`] declares what a task reads and writes.
//! - [`hash`] turns those declarations into a [`Fingerprint`] by hashing
//!   file content, directory listings and scalar properties with blake3.
//! - [`store`] persists the last successful fingerprint of every task.

pub mod hash;
pub mod spec;
pub mod store;

use serde::{Deserialize, Serialize};

pub use hash::{compute_dir_hash, compute_file_hash, compute_fingerprint, missing_outputs};
pub use spec::{InputSpec, OutputSpec, PropertyValue};
pub use store::{FileFingerprintStore, FingerprintStore, MemoryFingerprintStore};

/// Content digest of a task's declared inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub inputs: String,
    pub outputs: String,
}
