#![allow(dead_code)]

use std::path::{Path, PathBuf};

use frontdag::config::{ConfigFile, RawConfigFile};
use frontdag::types::FingerprintStorageMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    base: PathBuf,
}

impl ConfigFileBuilder {
    /// Config for Node.js `version`, anchored at `/work`.
    pub fn new(version: &str) -> Self {
        let mut config = RawConfigFile::default();
        config.node.version = Some(version.to_string());
        Self {
            config,
            base: PathBuf::from("/work"),
        }
    }

    pub fn anchored_at(mut self, base: impl AsRef<Path>) -> Self {
        self.base = base.as_ref().to_path_buf();
        self
    }

    pub fn project_directory(mut self, dir: &str) -> Self {
        self.config.project.directory = PathBuf::from(dir);
        self
    }

    pub fn install_directory(mut self, dir: &str) -> Self {
        self.config.node.install_directory = PathBuf::from(dir);
        self
    }

    /// Use the installation at `path` in place.
    pub fn provided_distribution(mut self, path: &str) -> Self {
        self.config.node.distribution_provided = true;
        self.config.node.distribution_path = Some(PathBuf::from(path));
        self
    }

    /// Copy the unpacked distribution at `path` instead of downloading.
    pub fn distribution_source(mut self, path: &str) -> Self {
        self.config.node.distribution_path = Some(PathBuf::from(path));
        self
    }

    pub fn distribution_url_root(mut self, root: &str) -> Self {
        self.config.node.distribution_url_root = root.to_string();
        self
    }

    pub fn install_script(mut self, args: &str) -> Self {
        self.config.scripts.install = Some(args.to_string());
        self
    }

    pub fn clean_script(mut self, args: &str) -> Self {
        self.config.scripts.clean = Some(args.to_string());
        self
    }

    pub fn check_script(mut self, args: &str) -> Self {
        self.config.scripts.check = Some(args.to_string());
        self
    }

    pub fn assemble_script(mut self, args: &str) -> Self {
        self.config.scripts.assemble = Some(args.to_string());
        self
    }

    pub fn publish_script(mut self, args: &str) -> Self {
        self.config.scripts.publish = Some(args.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn fingerprint_storage(mut self, mode: FingerprintStorageMode) -> Self {
        self.config.project.fingerprint_storage = mode;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .anchored_at(&self.base)
    }
}

/// `package.json` content declaring `package_manager` and `scripts`.
pub fn package_json(package_manager: &str, scripts: &[(&str, &str)]) -> String {
    let scripts: serde_json::Map<String, serde_json::Value> = scripts
        .iter()
        .map(|(name, cmd)| (name.to_string(), serde_json::Value::from(*cmd)))
        .collect();
    serde_json::json!({
        "name": "app",
        "packageManager": package_manager,
        "scripts": scripts,
    })
    .to_string()
}
