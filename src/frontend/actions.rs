// src/frontend/actions.rs

//! Actions behind the frontend tasks.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::info;

use crate::dag::TaskAction;
use crate::distribution::{DistributionDescriptor, Platform, script_executable};
use crate::errors::{FrontdagError, Result};
use crate::exec::{ScriptInvocation, ScriptRunner, check_exit};
use crate::frontend::manifest::PackageManifest;
use crate::frontend::package_manager::{PackageManagerKind, PackageManagerSpec};
use crate::fs::FileSystem;
use crate::install::Installer;

/// Package manager recorded by `resolve-package-manager`, if any.
pub fn resolved_package_manager(fs: &dyn FileSystem, spec_file: &Path) -> Option<PackageManagerKind> {
    let raw = fs.read_to_string(spec_file).ok()?;
    PackageManagerSpec::parse(&raw).ok().map(|spec| spec.kind)
}

/// Provisions Node.js into the install directory.
#[derive(Debug)]
pub struct InstallNodeAction {
    pub installer: Installer,
    pub descriptor: DistributionDescriptor,
    pub target: PathBuf,
    /// Unpacked distribution to copy instead of downloading.
    pub source: Option<PathBuf>,
}

impl TaskAction for InstallNodeAction {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let installer = self.installer.clone();
        let descriptor = self.descriptor.clone();
        let target = self.target.clone();
        let source = self.source.clone();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                installer
                    .ensure_installed(&descriptor, &target, source.as_deref())
                    .map(|_| ())
            })
            .await
            .map_err(|e| FrontdagError::Other(anyhow!("Node.js installation aborted: {e}")))?
        })
    }
}

/// Reads `packageManager` from the manifest and records the resolved
/// package manager and its executable path in the cache directory.
#[derive(Debug)]
pub struct ResolvePackageManagerAction {
    pub fs: Arc<dyn FileSystem>,
    pub manifest: PathBuf,
    pub node_directory: PathBuf,
    pub platform: Platform,
    pub spec_file: PathBuf,
    pub executable_path_file: PathBuf,
}

impl ResolvePackageManagerAction {
    fn resolve(&self) -> Result<()> {
        let manifest = PackageManifest::read(self.fs.as_ref(), &self.manifest)?.ok_or_else(|| {
            FrontdagError::ConfigError(format!("{} not found", self.manifest.display()))
        })?;
        let spec = manifest.package_manager()?;
        let executable = self
            .node_directory
            .join(script_executable(self.platform, spec.kind.executable_name()));

        for file in [&self.spec_file, &self.executable_path_file] {
            if let Some(parent) = file.parent() {
                self.fs.create_dir_all(parent)?;
            }
        }
        self.fs.write(&self.spec_file, spec.to_string().as_bytes())?;
        self.fs.write(
            &self.executable_path_file,
            executable.to_string_lossy().as_bytes(),
        )?;

        info!(package_manager = %spec, executable = %executable.display(), "package manager resolved");
        Ok(())
    }
}

impl TaskAction for ResolvePackageManagerAction {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.resolve() })
    }
}

/// Checks the Node.js installation, then enables one package manager
/// through corepack.
#[derive(Debug)]
pub struct InstallPackageManagerAction {
    pub task: String,
    pub kind: PackageManagerKind,
    pub installer: Installer,
    pub descriptor: DistributionDescriptor,
    pub node_directory: PathBuf,
    pub project_directory: PathBuf,
    pub environment: BTreeMap<String, String>,
    pub runner: Arc<dyn ScriptRunner>,
}

impl TaskAction for InstallPackageManagerAction {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.installer.verify(&self.descriptor, &self.node_directory)?;

            let corepack = self.node_directory.join(self.descriptor.corepack_executable());
            let invocation = ScriptInvocation::new(corepack, &self.project_directory)
                .args(["enable", self.kind.executable_name()])
                .envs(&self.environment);

            let code = self.runner.run(invocation).await?;
            check_exit(&self.task, code)
        })
    }
}

/// Runs the resolved package manager with fixed arguments.
#[derive(Debug)]
pub struct RunScriptAction {
    pub task: String,
    pub fs: Arc<dyn FileSystem>,
    pub executable_path_file: PathBuf,
    pub args: Vec<String>,
    pub project_directory: PathBuf,
    pub environment: BTreeMap<String, String>,
    pub runner: Arc<dyn ScriptRunner>,
}

impl TaskAction for RunScriptAction {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let executable = self.fs.read_to_string(&self.executable_path_file)?;
            let executable = PathBuf::from(executable.trim());

            let invocation = ScriptInvocation::new(executable, &self.project_directory)
                .args(self.args.iter().cloned())
                .envs(&self.environment);

            let code = self.runner.run(invocation).await?;
            check_exit(&self.task, code)
        })
    }
}
