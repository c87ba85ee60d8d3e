// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

use crate::distribution::{DEFAULT_URL_PATH_PATTERN, DEFAULT_URL_ROOT};
use crate::types::FingerprintStorageMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [node]
/// version = "20.11.1"
///
/// [project]
/// directory = "web"
///
/// [scripts]
/// install = "install"
/// assemble = "run build"
///
/// [environment]
/// CI = "true"
/// ```
///
/// Only `node.version` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub node: RawNodeSection,

    #[serde(default)]
    pub project: RawProjectSection,

    #[serde(default)]
    pub scripts: RawScriptsSection,

    /// Extra variables for every script.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// `[node]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawNodeSection {
    pub version: Option<String>,

    /// Node.js is already installed at `distribution_path`; use it in place.
    #[serde(default)]
    pub distribution_provided: bool,

    /// With `distribution_provided`, the installation to use. Otherwise an
    /// unpacked distribution copied instead of downloading.
    #[serde(default)]
    pub distribution_path: Option<PathBuf>,

    #[serde(default = "default_url_root")]
    pub distribution_url_root: String,

    #[serde(default = "default_url_path_pattern")]
    pub distribution_url_path_pattern: String,

    /// Relative to the project directory.
    #[serde(default = "default_install_directory")]
    pub install_directory: PathBuf,
}

fn default_url_root() -> String {
    DEFAULT_URL_ROOT.to_string()
}

fn default_url_path_pattern() -> String {
    DEFAULT_URL_PATH_PATTERN.to_string()
}

fn default_install_directory() -> PathBuf {
    PathBuf::from("node")
}

impl Default for RawNodeSection {
    fn default() -> Self {
        Self {
            version: None,
            distribution_provided: false,
            distribution_path: None,
            distribution_url_root: default_url_root(),
            distribution_url_path_pattern: default_url_path_pattern(),
            install_directory: default_install_directory(),
        }
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProjectSection {
    /// Directory holding `package.json`, relative to the config file.
    #[serde(default = "default_project_directory")]
    pub directory: PathBuf,

    /// Relative to the project directory.
    #[serde(default = "default_cache_directory")]
    pub cache_directory: PathBuf,

    #[serde(default)]
    pub fingerprint_storage: FingerprintStorageMode,
}

fn default_project_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from(".frontdag")
}

impl Default for RawProjectSection {
    fn default() -> Self {
        Self {
            directory: default_project_directory(),
            cache_directory: default_cache_directory(),
            fingerprint_storage: FingerprintStorageMode::default(),
        }
    }
}

/// `[scripts]` section. Each value is the argument string given to the
/// package manager, e.g. `"run build"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScriptsSection {
    #[serde(default)]
    pub install: Option<String>,
    #[serde(default)]
    pub clean: Option<String>,
    #[serde(default)]
    pub check: Option<String>,
    #[serde(default)]
    pub assemble: Option<String>,
    #[serde(default)]
    pub publish: Option<String>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub node: NodeConfig,
    pub project: ProjectConfig,
    pub scripts: ScriptsConfig,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub version: Version,
    pub distribution_provided: bool,
    pub distribution_path: Option<PathBuf>,
    pub distribution_url_root: String,
    pub distribution_url_path_pattern: String,
    pub install_directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub directory: PathBuf,
    pub cache_directory: PathBuf,
    pub fingerprint_storage: FingerprintStorageMode,
}

/// Script arguments, already split on whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptsConfig {
    pub install: Option<Vec<String>>,
    pub clean: Option<Vec<String>>,
    pub check: Option<Vec<String>>,
    pub assemble: Option<Vec<String>>,
    pub publish: Option<Vec<String>>,
}

impl ConfigFile {
    /// Anchor relative paths: the project directory at `base`, everything
    /// else at the project directory.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        self.project.directory = base.join(&self.project.directory);
        let project = self.project.directory.clone();

        self.project.cache_directory = project.join(&self.project.cache_directory);
        self.node.install_directory = project.join(&self.node.install_directory);
        self.node.distribution_path = self.node.distribution_path.map(|p| project.join(p));
        self
    }

    /// Directory the Node.js installation used by scripts lives in.
    pub fn node_directory(&self) -> &Path {
        match (&self.node.distribution_path, self.node.distribution_provided) {
            (Some(path), true) => path,
            _ => &self.node.install_directory,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project.directory.join(crate::frontend::MANIFEST_FILE_NAME)
    }
}
