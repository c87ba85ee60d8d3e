// src/frontend/manifest.rs

//! `package.json` inspection.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{FrontdagError, Result};
use crate::frontend::package_manager::PackageManagerSpec;
use crate::fs::FileSystem;

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// The parts of `package.json` the build cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(rename = "packageManager")]
    pub package_manager: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Read the manifest at `path`; `Ok(None)` when the file does not exist.
    pub fn read(fs: &dyn FileSystem, path: &Path) -> Result<Option<Self>> {
        if !fs.is_file(path) {
            return Ok(None);
        }
        let contents = fs.read_to_string(path)?;
        let manifest = serde_json::from_str(&contents)?;
        Ok(Some(manifest))
    }

    pub fn declares_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    pub fn package_manager(&self) -> Result<PackageManagerSpec> {
        let raw = self.package_manager.as_deref().ok_or_else(|| {
            FrontdagError::ConfigError(
                "package.json does not declare a 'packageManager' field".to_string(),
            )
        })?;
        PackageManagerSpec::parse(raw)
    }
}
