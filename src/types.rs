use std::str::FromStr;

use serde::Deserialize;

/// Where task fingerprints are kept between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStorageMode {
    /// JSON file in the project cache directory (`fingerprints.json`).
    File,
    /// In memory only; every invocation starts without history.
    Memory,
}

impl Default for FingerprintStorageMode {
    fn default() -> Self {
        FingerprintStorageMode::File
    }
}

impl FromStr for FingerprintStorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(FingerprintStorageMode::File),
            "memory" => Ok(FingerprintStorageMode::Memory),
            other => Err(format!(
                "invalid fingerprint_storage: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}
