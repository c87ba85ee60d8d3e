// src/install/installer.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::distribution::DistributionDescriptor;
use crate::errors::{FrontdagError, Result};
use crate::fs::{FileSystem, copy_dir_all};
use crate::install::fetch::DistributionFetcher;

/// A runtime root together with the executables it must contain.
///
/// It counts as installed only when the directory exists and every expected
/// executable is a regular file; anything less is treated as not installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationDirectory {
    root: PathBuf,
    executables: Vec<PathBuf>,
}

impl InstallationDirectory {
    pub fn new(root: impl Into<PathBuf>, executables: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            executables,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths of the expected executables.
    pub fn executables(&self) -> Vec<PathBuf> {
        self.executables.iter().map(|e| self.root.join(e)).collect()
    }

    /// Expected executables that are absent or not regular files.
    pub fn missing(&self, fs: &dyn FileSystem) -> Vec<PathBuf> {
        self.executables
            .iter()
            .filter(|e| !fs.is_file(&self.root.join(e)))
            .cloned()
            .collect()
    }

    pub fn is_installed(&self, fs: &dyn FileSystem) -> bool {
        fs.is_dir(&self.root) && self.missing(fs).is_empty()
    }

    fn check(&self, fs: &dyn FileSystem) -> Result<()> {
        let missing = if fs.is_dir(&self.root) {
            self.missing(fs)
        } else {
            self.executables.clone()
        };
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FrontdagError::InstallationInvalid {
                directory: self.root.clone(),
                missing,
            })
        }
    }
}

/// File inside an installation naming the distribution it was built from.
pub const DISTRIBUTION_STAMP: &str = ".frontdag-distribution";

/// Materializes Node.js installations.
#[derive(Debug, Clone)]
pub struct Installer {
    fs: Arc<dyn FileSystem>,
    fetcher: Arc<dyn DistributionFetcher>,
}

impl Installer {
    pub fn new(fs: Arc<dyn FileSystem>, fetcher: Arc<dyn DistributionFetcher>) -> Self {
        Self { fs, fetcher }
    }

    /// Make `target` a complete installation of `descriptor`.
    ///
    /// An already valid installation is left untouched. Otherwise a fresh tree
    /// is built next to `target`, either copied from `provided` or downloaded
    /// and extracted, verified, and then swapped in place of `target`.
    pub fn ensure_installed(
        &self,
        descriptor: &DistributionDescriptor,
        target: &Path,
        provided: Option<&Path>,
    ) -> Result<InstallationDirectory> {
        let installation = InstallationDirectory::new(target, descriptor.executables.clone());
        if installation.is_installed(self.fs.as_ref()) {
            match self.installed_distribution(target) {
                Some(found) if found != descriptor.root_entry => {
                    info!(target = %target.display(), %found, wanted = %descriptor.root_entry, "replacing installed distribution");
                }
                _ => {
                    debug!(target = %target.display(), "installation already valid");
                    return Ok(installation);
                }
            }
        }

        let workspace = StagingArea::next_to(target)?;
        self.clear(&workspace.root)?;

        let staged = match self.materialize(descriptor, &workspace, provided) {
            Ok(staged) => staged,
            Err(err) => {
                self.cleanup(&workspace);
                return Err(err);
            }
        };

        let staged_installation = InstallationDirectory::new(&staged, descriptor.executables.clone());
        if let Err(err) = staged_installation.check(self.fs.as_ref()) {
            warn!(staged = %staged.display(), error = %err, "materialized distribution is incomplete");
            self.cleanup(&workspace);
            return Err(match err {
                FrontdagError::InstallationInvalid { missing, .. } => FrontdagError::InstallationInvalid {
                    directory: target.to_path_buf(),
                    missing,
                },
                other => other,
            });
        }

        self.fs.write(
            &staged.join(DISTRIBUTION_STAMP),
            format!("{}\n", descriptor.root_entry).as_bytes(),
        )?;
        self.clear(target)?;
        self.fs.rename(&staged, target)?;
        self.cleanup(&workspace);

        installation.check(self.fs.as_ref())?;
        info!(target = %target.display(), version = %descriptor.version, "Node.js installed");
        Ok(installation)
    }

    /// Check that `target` still holds the runtime executables, without
    /// touching it. Package manager launchers are not checked since corepack
    /// owns them once the installation is in use.
    pub fn verify(&self, descriptor: &DistributionDescriptor, target: &Path) -> Result<InstallationDirectory> {
        let installation = InstallationDirectory::new(target, descriptor.runtime_executables());
        installation.check(self.fs.as_ref())?;
        Ok(installation)
    }

    /// Build the new tree inside the staging area and return its root.
    fn materialize(
        &self,
        descriptor: &DistributionDescriptor,
        workspace: &StagingArea,
        provided: Option<&Path>,
    ) -> Result<PathBuf> {
        if let Some(source) = provided {
            if !self.fs.is_dir(source) {
                return Err(FrontdagError::ConfigError(format!(
                    "provided distribution {} is not a directory",
                    source.display()
                )));
            }
            debug!(source = %source.display(), "copying provided distribution");
            copy_dir_all(self.fs.as_ref(), source, &workspace.root)?;
            return Ok(workspace.root.clone());
        }

        let archive = workspace.archive_path(descriptor);
        self.fetcher.download(&descriptor.url, &archive)?;
        self.fs.create_dir_all(&workspace.root)?;
        self.fetcher.extract(&archive, &workspace.root)?;

        let nested = workspace.root.join(&descriptor.root_entry);
        if self.fs.is_dir(&nested) {
            Ok(nested)
        } else {
            Ok(workspace.root.clone())
        }
    }

    /// Root entry recorded by the install that produced `target`. Trees
    /// provisioned out-of-band carry no stamp.
    fn installed_distribution(&self, target: &Path) -> Option<String> {
        let stamp = self.fs.read_to_string(&target.join(DISTRIBUTION_STAMP)).ok()?;
        Some(stamp.trim().to_string())
    }

    fn clear(&self, dir: &Path) -> Result<()> {
        if self.fs.is_dir(dir) {
            self.fs.remove_dir_all(dir)?;
        } else if self.fs.exists(dir) {
            self.fs.remove_file(dir)?;
        }
        Ok(())
    }

    fn cleanup(&self, workspace: &StagingArea) {
        for path in [&workspace.root, &workspace.archive_dir] {
            if let Err(err) = self.clear(path) {
                warn!(path = %path.display(), error = %err, "could not remove staging files");
            }
        }
    }
}

/// Sibling paths of the target used while materializing.
#[derive(Debug)]
struct StagingArea {
    root: PathBuf,
    archive_dir: PathBuf,
}

impl StagingArea {
    fn next_to(target: &Path) -> Result<Self> {
        let name = target.file_name().ok_or_else(|| {
            FrontdagError::ConfigError(format!(
                "installation directory {} has no name",
                target.display()
            ))
        })?;
        let name = name.to_string_lossy();
        Ok(Self {
            root: target.with_file_name(format!(".{name}.staging")),
            archive_dir: target.with_file_name(format!(".{name}.download")),
        })
    }

    fn archive_path(&self, descriptor: &DistributionDescriptor) -> PathBuf {
        let file_name = descriptor
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.{}", descriptor.root_entry, descriptor.platform.archive_type()));
        self.archive_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Arch, DistributionResolver, Os, Platform};
    use crate::fs::MockFileSystem;
    use std::sync::Mutex;
    use url::Url;

    /// Fetcher that fakes an archive by writing the extracted tree directly.
    #[derive(Debug)]
    struct TreeFetcher {
        fs: MockFileSystem,
        files: Vec<String>,
        downloads: Mutex<Vec<Url>>,
    }

    impl DistributionFetcher for TreeFetcher {
        fn download(&self, url: &Url, destination: &Path) -> Result<()> {
            self.downloads.lock().unwrap().push(url.clone());
            self.fs.add_file(destination, "archive");
            Ok(())
        }

        fn extract(&self, _archive: &Path, target: &Path) -> Result<()> {
            for file in &self.files {
                self.fs.add_file(target.join(file), "bin");
            }
            Ok(())
        }
    }

    fn descriptor() -> DistributionDescriptor {
        let platform = Platform::new(Os::Linux, Arch::X64).unwrap();
        DistributionResolver::default().resolve("20.11.1", platform).unwrap()
    }

    fn installer(fs: &MockFileSystem, files: &[&str]) -> (Installer, Arc<TreeFetcher>) {
        let fetcher = Arc::new(TreeFetcher {
            fs: fs.clone(),
            files: files.iter().map(|f| f.to_string()).collect(),
            downloads: Mutex::new(Vec::new()),
        });
        (Installer::new(Arc::new(fs.clone()), fetcher.clone()), fetcher)
    }

    const FULL: &[&str] = &[
        "node-v20.11.1-linux-x64/bin/node",
        "node-v20.11.1-linux-x64/bin/npm",
        "node-v20.11.1-linux-x64/bin/npx",
        "node-v20.11.1-linux-x64/bin/corepack",
    ];

    #[test]
    fn downloads_extracts_and_strips_root_entry() {
        let fs = MockFileSystem::new();
        let (installer, fetcher) = installer(&fs, FULL);
        let target = Path::new("cache/node");

        let installation = installer.ensure_installed(&descriptor(), target, None).unwrap();

        assert!(installation.is_installed(&fs));
        assert!(fs.is_file(Path::new("cache/node/bin/corepack")));
        assert!(!fs.exists(Path::new("cache/.node.staging")));
        assert!(!fs.exists(Path::new("cache/.node.download")));
        assert_eq!(fetcher.downloads.lock().unwrap().len(), 1);
    }

    #[test]
    fn valid_installation_is_not_touched() {
        let fs = MockFileSystem::new();
        for exe in ["bin/node", "bin/npm", "bin/npx", "bin/corepack"] {
            fs.add_file(Path::new("node").join(exe), "bin");
        }
        fs.add_file("node/user-file", "keep");
        let (installer, fetcher) = installer(&fs, FULL);

        installer.ensure_installed(&descriptor(), Path::new("node"), None).unwrap();
        installer.ensure_installed(&descriptor(), Path::new("node"), None).unwrap();

        assert!(fetcher.downloads.lock().unwrap().is_empty());
        assert_eq!(fs.contents("node/user-file").unwrap(), b"keep");
    }

    #[test]
    fn installation_of_another_version_is_replaced() {
        let fs = MockFileSystem::new();
        for exe in ["bin/node", "bin/npm", "bin/npx", "bin/corepack"] {
            fs.add_file(Path::new("node").join(exe), "v18");
        }
        fs.add_file(Path::new("node").join(DISTRIBUTION_STAMP), "node-v18.19.0-linux-x64\n");
        let (installer, fetcher) = installer(&fs, FULL);

        installer.ensure_installed(&descriptor(), Path::new("node"), None).unwrap();

        assert_eq!(fetcher.downloads.lock().unwrap().len(), 1);
        assert_eq!(fs.contents("node/bin/node").unwrap(), b"bin");
        assert_eq!(
            fs.read_to_string(&Path::new("node").join(DISTRIBUTION_STAMP)).unwrap(),
            "node-v20.11.1-linux-x64\n"
        );

        installer.ensure_installed(&descriptor(), Path::new("node"), None).unwrap();
        assert_eq!(fetcher.downloads.lock().unwrap().len(), 1);
    }

    #[test]
    fn partial_installation_is_replaced_wholesale() {
        let fs = MockFileSystem::new();
        fs.add_file("node/bin/node", "stale");
        fs.add_file("node/leftover", "junk");
        let (installer, _) = installer(&fs, FULL);

        installer.ensure_installed(&descriptor(), Path::new("node"), None).unwrap();

        assert_eq!(fs.contents("node/bin/node").unwrap(), b"bin");
        assert!(!fs.exists(Path::new("node/leftover")));
    }

    #[test]
    fn incomplete_archive_is_installation_invalid() {
        let fs = MockFileSystem::new();
        let (installer, _) = installer(&fs, &["node-v20.11.1-linux-x64/bin/node"]);

        let err = installer
            .ensure_installed(&descriptor(), Path::new("node"), None)
            .unwrap_err();

        match err {
            FrontdagError::InstallationInvalid { directory, missing } => {
                assert_eq!(directory, PathBuf::from("node"));
                assert_eq!(missing.len(), 3);
            }
            other => panic!("expected InstallationInvalid, got {other:?}"),
        }
        assert!(!fs.exists(Path::new(".node.staging")));
    }

    #[test]
    fn copies_provided_distribution() {
        let fs = MockFileSystem::new();
        for exe in ["bin/node", "bin/npm", "bin/npx", "bin/corepack"] {
            fs.add_file(Path::new("mirror").join(exe), "bin");
        }
        let (installer, fetcher) = installer(&fs, &[]);

        installer
            .ensure_installed(&descriptor(), Path::new("node"), Some(Path::new("mirror")))
            .unwrap();

        assert!(fs.is_file(Path::new("node/bin/npx")));
        assert!(fs.is_file(Path::new("mirror/bin/npx")));
        assert!(fetcher.downloads.lock().unwrap().is_empty());
    }

    #[test]
    fn verify_reports_missing_executables() {
        let fs = MockFileSystem::new();
        fs.add_dir("node");
        let (installer, _) = installer(&fs, &[]);

        let err = installer.verify(&descriptor(), Path::new("node")).unwrap_err();
        assert!(matches!(err, FrontdagError::InstallationInvalid { missing, .. } if missing.len() == 2));
        assert!(fs.is_dir(Path::new("node")));

        fs.add_file("node/bin/node", "bin");
        fs.add_file("node/bin/corepack", "bin");
        assert!(installer.verify(&descriptor(), Path::new("node")).is_ok());
    }
}
