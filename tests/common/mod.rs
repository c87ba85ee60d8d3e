#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use frontdag::config::ConfigFile;
use frontdag::distribution::{Arch, DistributionDescriptor, DistributionResolver, Os, Platform};
use frontdag::engine::{BuildReport, Orchestrator, TaskOutcome};
use frontdag::fingerprint::MemoryFingerprintStore;
use frontdag::frontend::{Collaborators, INSTALL_FRONTEND, frontend_tasks};
use frontdag::fs::{FileSystem, MockFileSystem};
use frontdag_test_utils::builders::{ConfigFileBuilder, package_json};
use frontdag_test_utils::fakes::{FakeFetcher, FakeScriptRunner};

pub const NODE_VERSION: &str = "20.11.1";

pub fn linux() -> Platform {
    Platform::new(Os::Linux, Arch::X64).unwrap()
}

pub fn descriptor() -> DistributionDescriptor {
    DistributionResolver::default()
        .resolve(NODE_VERSION, linux())
        .unwrap()
}

/// A frontend project at `/work` on a mock filesystem, with fake downloads
/// and fake scripts. Every [`Project::run`] registers the tasks afresh, like
/// a new invocation of the binary, against one shared fingerprint store.
pub struct Project {
    pub fs: MockFileSystem,
    pub fetcher: FakeFetcher,
    pub runner: FakeScriptRunner,
    pub store: MemoryFingerprintStore,
    pub config: ConfigFile,
}

impl Project {
    pub fn new(config: ConfigFile) -> Self {
        let fs = MockFileSystem::new();
        Self {
            fetcher: FakeFetcher::new(&fs, &descriptor()),
            runner: FakeScriptRunner::new(&fs),
            store: MemoryFingerprintStore::new(),
            fs,
            config,
        }
    }

    /// Project whose `package.json` selects `package_manager`.
    pub fn with_manifest(package_manager: &str, scripts: &[(&str, &str)]) -> Self {
        Self::with_manifest_and_config(
            package_manager,
            scripts,
            ConfigFileBuilder::new(NODE_VERSION).build(),
        )
    }

    pub fn with_manifest_and_config(
        package_manager: &str,
        scripts: &[(&str, &str)],
        config: ConfigFile,
    ) -> Self {
        let project = Self::new(config);
        project.write_manifest(package_manager, scripts);
        project
    }

    pub fn write_manifest(&self, package_manager: &str, scripts: &[(&str, &str)]) {
        self.fs
            .add_file(self.manifest_path(), package_json(package_manager, scripts));
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config.manifest_path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.config.project.directory.join(relative)
    }

    pub fn node_path(&self, relative: &str) -> PathBuf {
        self.config.node_directory().join(relative)
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let collaborators = Collaborators {
            fs: Arc::new(self.fs.clone()),
            fetcher: Arc::new(self.fetcher.clone()),
            runner: Arc::new(self.runner.clone()),
        };
        let tasks = frontend_tasks(&self.config, linux(), &collaborators).unwrap();
        Orchestrator::new(tasks, collaborators.fs, Box::new(self.store.clone())).unwrap()
    }

    /// Run `targets`; afterwards the runner holds only this run's scripts.
    pub async fn run(&self, targets: &[&str]) -> BuildReport {
        self.runner.reset();
        self.orchestrator().run(targets).await.unwrap()
    }

    pub async fn install(&self) -> BuildReport {
        self.run(&[INSTALL_FRONTEND]).await
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if self.fs.is_dir(path) {
            self.fs.remove_dir_all(path).unwrap();
        } else {
            self.fs.remove_file(path).unwrap();
        }
    }
}

/// Outcome of `task`, panicking with the whole report when absent.
pub fn outcome(report: &BuildReport, task: &str) -> TaskOutcome {
    report
        .outcome_of(task)
        .unwrap_or_else(|| panic!("task '{task}' has no outcome in {report:?}"))
}
