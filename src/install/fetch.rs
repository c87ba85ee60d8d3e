// src/install/fetch.rs

//! Archive download and extraction.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::errors::{FrontdagError, Result};

/// Gets a distribution archive onto disk and unpacks it.
///
/// Both operations are blocking; async callers go through
/// `tokio::task::spawn_blocking`.
pub trait DistributionFetcher: Send + Sync + Debug {
    /// Download `url` to the file `destination`.
    fn download(&self, url: &Url, destination: &Path) -> Result<()>;

    /// Extract `archive` into the existing directory `target`.
    fn extract(&self, archive: &Path, target: &Path) -> Result<()>;
}

/// Fetcher backed by `reqwest` for `http(s)://` URLs and plain copies for
/// `file://` URLs. Extracts `.tar.gz`/`.tgz` and `.zip` archives.
#[derive(Debug, Clone)]
pub struct HttpDistributionFetcher {
    timeout: Duration,
}

impl Default for HttpDistributionFetcher {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
        }
    }
}

impl HttpDistributionFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn download_http(&self, url: &Url, destination: &Path) -> Result<()> {
        let failure = |reason: String| FrontdagError::DownloadError {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("frontdag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| failure(e.to_string()))?;

        let mut response = client
            .get(url.as_str())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| failure(e.without_url().to_string()))?;

        let parent = parent_dir(destination)?;
        fs::create_dir_all(parent)?;
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        let bytes = io::copy(&mut response, temp.as_file_mut()).map_err(|e| failure(e.to_string()))?;
        temp.as_file().sync_all()?;
        temp.persist(destination).map_err(|e| FrontdagError::IoError(e.error))?;

        debug!(url = %url, bytes, "download complete");
        Ok(())
    }
}

impl DistributionFetcher for HttpDistributionFetcher {
    fn download(&self, url: &Url, destination: &Path) -> Result<()> {
        info!(url = %url, destination = %destination.display(), "downloading distribution");

        match url.scheme() {
            "http" | "https" => self.download_http(url, destination),
            "file" => {
                let source = url.to_file_path().map_err(|_| FrontdagError::DownloadError {
                    url: url.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                fs::create_dir_all(parent_dir(destination)?)?;
                fs::copy(&source, destination).map_err(|e| FrontdagError::DownloadError {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(())
            }
            other => Err(FrontdagError::DownloadError {
                url: url.to_string(),
                reason: format!("unsupported URL scheme '{other}'"),
            }),
        }
    }

    fn extract(&self, archive: &Path, target: &Path) -> Result<()> {
        info!(archive = %archive.display(), target = %target.display(), "extracting distribution");

        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            extract_tar_gz(archive, target)
        } else if name.ends_with(".zip") {
            extract_zip(archive, target)
        } else {
            Err(FrontdagError::ExtractionError {
                archive: archive.to_path_buf(),
                reason: "unsupported archive format".to_string(),
            })
        }
    }
}

fn parent_dir(path: &Path) -> Result<&Path> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent),
        Some(_) => Ok(Path::new(".")),
        None => Err(FrontdagError::ConfigError(format!(
            "{} has no parent directory",
            path.display()
        ))),
    }
}

fn extract_tar_gz(archive_path: &Path, target: &Path) -> Result<()> {
    let failure = |e: io::Error| FrontdagError::ExtractionError {
        archive: archive_path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = fs::File::open(archive_path)?;
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));

    // unpack_in refuses entries escaping `target`.
    for entry in archive.entries().map_err(failure)? {
        let mut entry = entry.map_err(failure)?;
        entry.unpack_in(target).map_err(failure)?;
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, target: &Path) -> Result<()> {
    let failure = |reason: String| FrontdagError::ExtractionError {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| failure(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| failure(e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out).map_err(|e| failure(e.to_string()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}
