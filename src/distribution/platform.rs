// src/distribution/platform.rs

use std::fmt;

use crate::errors::{FrontdagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOS,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
    Armv7l,
}

/// A supported OS/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    os: Os,
    arch: Arch,
}

impl Platform {
    /// Build a platform, rejecting pairs no distribution is published for.
    pub fn new(os: Os, arch: Arch) -> Result<Self> {
        if arch == Arch::Armv7l && os != Os::Linux {
            return Err(FrontdagError::UnsupportedPlatform(format!(
                "{:?} on {:?}",
                os, arch
            )));
        }
        Ok(Self { os, arch })
    }

    /// Platform of the running process.
    pub fn current() -> Result<Self> {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target names (`std::env::consts`) to a platform.
    pub fn from_names(os: &str, arch: &str) -> Result<Self> {
        let unsupported = || FrontdagError::UnsupportedPlatform(format!("{os}-{arch}"));

        let os = match os {
            "linux" => Os::Linux,
            "macos" => Os::MacOS,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };
        let arch = match arch {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Armv7l,
            _ => return Err(unsupported()),
        };

        Self::new(os, arch).map_err(|_| unsupported())
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// `<os>-<arch>` as used in distribution file names.
    pub fn classifier(&self) -> String {
        let os = match self.os {
            Os::Linux => "linux",
            Os::MacOS => "darwin",
            Os::Windows => "win",
        };
        let arch = match self.arch {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
            Arch::Armv7l => "armv7l",
        };
        format!("{os}-{arch}")
    }

    /// Archive extension of the distribution for this platform.
    pub fn archive_type(&self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.gz" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.classifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_platform_is_detected_on_supported_hosts() {
        #[cfg(all(
            any(target_os = "linux", target_os = "macos", target_os = "windows"),
            any(target_arch = "x86_64", target_arch = "aarch64")
        ))]
        assert!(Platform::current().is_ok());
    }

    #[test]
    fn classifiers() {
        let cases = [
            ("linux", "x86_64", "linux-x64", "tar.gz"),
            ("linux", "aarch64", "linux-arm64", "tar.gz"),
            ("linux", "arm", "linux-armv7l", "tar.gz"),
            ("macos", "x86_64", "darwin-x64", "tar.gz"),
            ("macos", "aarch64", "darwin-arm64", "tar.gz"),
            ("windows", "x86_64", "win-x64", "zip"),
            ("windows", "aarch64", "win-arm64", "zip"),
        ];
        for (os, arch, classifier, archive) in cases {
            let platform = Platform::from_names(os, arch).unwrap();
            assert_eq!(platform.classifier(), classifier);
            assert_eq!(platform.archive_type(), archive);
        }
    }

    #[test]
    fn unsupported_pairs_are_rejected() {
        for (os, arch) in [("freebsd", "x86_64"), ("linux", "riscv64"), ("windows", "arm")] {
            let err = Platform::from_names(os, arch).unwrap_err();
            assert!(matches!(err, FrontdagError::UnsupportedPlatform(msg) if msg == format!("{os}-{arch}")));
        }
    }
}
