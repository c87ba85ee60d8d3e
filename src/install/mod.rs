// src/install/mod.rs

//! Idempotent Node.js provisioning.

pub mod fetch;
pub mod installer;

pub use fetch::{DistributionFetcher, HttpDistributionFetcher};
pub use installer::{DISTRIBUTION_STAMP, InstallationDirectory, Installer};
