// src/distribution/node.rs

use std::path::PathBuf;

use semver::Version;
use url::Url;

use crate::distribution::platform::Platform;
use crate::errors::{FrontdagError, Result};

pub const DEFAULT_URL_ROOT: &str = "https://nodejs.org/dist/";
pub const DEFAULT_URL_PATH_PATTERN: &str = "vVERSION/node-vVERSION-ARCH.TYPE";

/// Oldest release shipping corepack.
const MIN_NODE_VERSION: Version = Version::new(16, 9, 0);

/// Everything needed to fetch and check one Node.js distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionDescriptor {
    pub version: Version,
    pub platform: Platform,
    pub url: Url,
    /// Top-level directory inside the archive.
    pub root_entry: String,
    /// Executables that must exist, relative to the installation directory.
    pub executables: Vec<PathBuf>,
}

impl DistributionDescriptor {
    /// Directory holding the executables, relative to the installation root.
    pub fn executable_dir(&self) -> PathBuf {
        executable_dir(self.platform)
    }

    pub fn node_executable(&self) -> PathBuf {
        node_executable(self.platform)
    }

    pub fn corepack_executable(&self) -> PathBuf {
        script_executable(self.platform, "corepack")
    }

    /// Executables that `corepack enable` never rewrites.
    pub fn runtime_executables(&self) -> Vec<PathBuf> {
        vec![self.node_executable(), self.corepack_executable()]
    }
}

/// Relative directory of executables in a Node.js installation.
pub fn executable_dir(platform: Platform) -> PathBuf {
    if platform.is_windows() {
        PathBuf::new()
    } else {
        PathBuf::from("bin")
    }
}

pub fn node_executable(platform: Platform) -> PathBuf {
    let name = if platform.is_windows() { "node.exe" } else { "node" };
    executable_dir(platform).join(name)
}

/// Relative path of a launcher script such as `npm` or `corepack`.
pub fn script_executable(platform: Platform, name: &str) -> PathBuf {
    let name = if platform.is_windows() {
        format!("{name}.cmd")
    } else {
        name.to_string()
    };
    executable_dir(platform).join(name)
}

/// Parse a Node.js version, requiring a plain `X.Y.Z` form.
pub fn parse_node_version(raw: &str) -> Result<Version> {
    let version = Version::parse(raw.trim())
        .map_err(|e| FrontdagError::ConfigError(format!("invalid Node.js version '{raw}': {e}")))?;

    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err(FrontdagError::ConfigError(format!(
            "Node.js version '{raw}' must be a release version X.Y.Z"
        )));
    }
    if version < MIN_NODE_VERSION {
        return Err(FrontdagError::ConfigError(format!(
            "Node.js version {version} is not supported, {MIN_NODE_VERSION} or later is required"
        )));
    }
    Ok(version)
}

/// Maps a version and platform to a [`DistributionDescriptor`].
#[derive(Debug, Clone)]
pub struct DistributionResolver {
    /// Always ends with `/` so joining keeps its last segment.
    url_root: String,
    path_pattern: String,
}

impl Default for DistributionResolver {
    fn default() -> Self {
        Self {
            url_root: DEFAULT_URL_ROOT.to_string(),
            path_pattern: DEFAULT_URL_PATH_PATTERN.to_string(),
        }
    }
}

impl DistributionResolver {
    pub fn new(url_root: &str, path_pattern: &str) -> Result<Self> {
        let mut root = url_root.trim().to_string();
        if !root.ends_with('/') {
            root.push('/');
        }
        Url::parse(&root).map_err(|e| {
            FrontdagError::ConfigError(format!("invalid distribution URL root '{url_root}': {e}"))
        })?;

        let path_pattern = path_pattern.trim().trim_start_matches('/').to_string();
        if path_pattern.is_empty() {
            return Err(FrontdagError::ConfigError(
                "distribution URL path pattern is empty".to_string(),
            ));
        }

        Ok(Self {
            url_root: root,
            path_pattern,
        })
    }

    pub fn resolve(&self, version: &str, platform: Platform) -> Result<DistributionDescriptor> {
        let version = parse_node_version(version)?;
        let classifier = platform.classifier();

        let path = self
            .path_pattern
            .replace("VERSION", &version.to_string())
            .replace("ARCH", &classifier)
            .replace("TYPE", platform.archive_type());
        let url = Url::parse(&self.url_root)
            .and_then(|root| root.join(&path))
            .map_err(|e| {
                FrontdagError::ConfigError(format!("invalid distribution URL path '{path}': {e}"))
            })?;

        let executables = vec![
            node_executable(platform),
            script_executable(platform, "npm"),
            script_executable(platform, "npx"),
            script_executable(platform, "corepack"),
        ];

        Ok(DistributionDescriptor {
            root_entry: format!("node-v{version}-{classifier}"),
            version,
            platform,
            url,
            executables,
        })
    }
}
