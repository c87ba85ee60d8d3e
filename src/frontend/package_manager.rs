// src/frontend/package_manager.rs

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use semver::Version;

use crate::errors::{FrontdagError, Result};

/// Package manager variants provisioned through corepack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageManagerKind {
    Npm,
    Pnpm,
    Yarn,
}

impl PackageManagerKind {
    pub const ALL: [PackageManagerKind; 3] = [
        PackageManagerKind::Npm,
        PackageManagerKind::Pnpm,
        PackageManagerKind::Yarn,
    ];

    /// Name of the launcher, also the name given to `corepack enable`.
    pub fn executable_name(self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Pnpm => "pnpm",
            PackageManagerKind::Yarn => "yarn",
        }
    }

    /// Launchers `corepack enable` writes next to the corepack executable.
    pub fn shim_names(self) -> [&'static str; 2] {
        match self {
            PackageManagerKind::Npm => ["npm", "npx"],
            PackageManagerKind::Pnpm => ["pnpm", "pnpx"],
            PackageManagerKind::Yarn => ["yarn", "yarnpkg"],
        }
    }

    pub fn lock_file(self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "package-lock.json",
            PackageManagerKind::Pnpm => "pnpm-lock.yaml",
            PackageManagerKind::Yarn => "yarn.lock",
        }
    }

    /// Arguments installing the project's dependencies when no install
    /// script is configured.
    pub fn default_install_args(self) -> &'static [&'static str] {
        &["install"]
    }

    pub fn install_task_name(self) -> String {
        format!("install-{}", self.executable_name())
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable_name())
    }
}

impl FromStr for PackageManagerKind {
    type Err = FrontdagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "npm" => Ok(PackageManagerKind::Npm),
            "pnpm" => Ok(PackageManagerKind::Pnpm),
            "yarn" => Ok(PackageManagerKind::Yarn),
            other => Err(FrontdagError::ConfigError(format!(
                "unsupported package manager '{other}' (expected npm, pnpm or yarn)"
            ))),
        }
    }
}

/// Value of the `packageManager` field of `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManagerSpec {
    pub kind: PackageManagerKind,
    pub version: Version,
}

impl PackageManagerSpec {
    /// Parse `<npm|pnpm|yarn>@X.Y.Z`, with an optional `+<hash>` suffix.
    pub fn parse(raw: &str) -> Result<Self> {
        let pattern = Regex::new(r"^(npm|pnpm|yarn)@(\d+\.\d+\.\d+)(\+\S+)?$")
            .map_err(|e| FrontdagError::Other(e.into()))?;

        let malformed = || {
            FrontdagError::ConfigError(format!(
                "malformed packageManager '{raw}' (expected <npm|pnpm|yarn>@X.Y.Z)"
            ))
        };

        let captures = pattern.captures(raw.trim()).ok_or_else(malformed)?;
        let kind = captures[1].parse()?;
        let version = Version::parse(&captures[2]).map_err(|_| malformed())?;

        Ok(Self { kind, version })
    }
}

impl fmt::Display for PackageManagerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind, self.version)
    }
}
