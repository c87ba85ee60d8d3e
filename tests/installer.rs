// tests/installer.rs

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{NODE_VERSION, linux};
use frontdag::config::ConfigFile;
use frontdag::distribution::{DEFAULT_URL_PATH_PATTERN, DistributionResolver};
use frontdag::engine::{BuildReport, Orchestrator, TaskOutcome};
use frontdag::errors::FrontdagError;
use frontdag::exec::ProcessScriptRunner;
use frontdag::fingerprint::FileFingerprintStore;
use frontdag::frontend::{Collaborators, INSTALL_NODE, frontend_tasks};
use frontdag::fs::RealFileSystem;
use frontdag::install::{HttpDistributionFetcher, Installer};
use frontdag_test_utils::builders::ConfigFileBuilder;
use frontdag_test_utils::init_tracing;
use tempfile::TempDir;
use url::Url;

const ROOT_ENTRY: &str = "node-v20.11.1-linux-x64";

/// Lay out `<mirror>/v20.11.1/node-v20.11.1-linux-x64.tar.gz` holding the
/// given executables, and return the mirror's URL.
fn publish_mirror(mirror: &Path, executables: &[&str]) -> String {
    let release = mirror.join(format!("v{NODE_VERSION}"));
    fs::create_dir_all(&release).unwrap();

    let file = fs::File::create(release.join(format!("{ROOT_ENTRY}.tar.gz"))).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for exe in executables {
        let content = format!("#!/bin/sh\necho {exe}\n");
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{ROOT_ENTRY}/{exe}"), content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();

    Url::from_directory_path(mirror).unwrap().to_string()
}

const ALL: &[&str] = &["bin/node", "bin/npm", "bin/npx", "bin/corepack"];

fn installer() -> Installer {
    Installer::new(
        Arc::new(RealFileSystem),
        Arc::new(HttpDistributionFetcher::default()),
    )
}

#[test]
fn installs_from_file_mirror_and_is_idempotent() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let url_root = publish_mirror(&tmp.path().join("mirror"), ALL);
    let descriptor = DistributionResolver::new(&url_root, DEFAULT_URL_PATH_PATTERN)
        .unwrap()
        .resolve(NODE_VERSION, linux())
        .unwrap();
    let target = tmp.path().join("node");

    let installation = installer().ensure_installed(&descriptor, &target, None).unwrap();

    assert_eq!(installation.root(), target);
    assert!(target.join("bin/corepack").is_file());
    assert!(!tmp.path().join(".node.staging").exists());
    assert!(!tmp.path().join(".node.download").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(target.join("bin/node")).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "node must stay executable");
    }

    // Without the mirror a second call can only succeed by not downloading.
    fs::remove_dir_all(tmp.path().join("mirror")).unwrap();
    fs::write(target.join("marker"), "user data").unwrap();
    installer().ensure_installed(&descriptor, &target, None).unwrap();
    assert_eq!(fs::read_to_string(target.join("marker")).unwrap(), "user data");
}

#[test]
fn incomplete_archive_leaves_no_installation_behind() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let url_root = publish_mirror(&tmp.path().join("mirror"), &["bin/node"]);
    let descriptor = DistributionResolver::new(&url_root, DEFAULT_URL_PATH_PATTERN)
        .unwrap()
        .resolve(NODE_VERSION, linux())
        .unwrap();
    let target = tmp.path().join("node");

    let err = installer()
        .ensure_installed(&descriptor, &target, None)
        .unwrap_err();

    match err {
        FrontdagError::InstallationInvalid { directory, missing } => {
            assert_eq!(directory, target);
            assert_eq!(missing.len(), 3);
        }
        other => panic!("expected InstallationInvalid, got {other:?}"),
    }
    assert!(!target.exists());
    assert!(!tmp.path().join(".node.staging").exists());
}

#[test]
fn missing_release_is_a_download_error() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let url_root = publish_mirror(&tmp.path().join("mirror"), ALL);
    let descriptor = DistributionResolver::new(&url_root, DEFAULT_URL_PATH_PATTERN)
        .unwrap()
        .resolve("22.0.0", linux())
        .unwrap();

    let err = installer()
        .ensure_installed(&descriptor, &tmp.path().join("node"), None)
        .unwrap_err();
    assert!(matches!(err, FrontdagError::DownloadError { .. }));
}

/// One invocation of `install-node` with production collaborators.
async fn install_node(config: &ConfigFile) -> BuildReport {
    let collaborators = Collaborators {
        fs: Arc::new(RealFileSystem),
        fetcher: Arc::new(HttpDistributionFetcher::default()),
        runner: Arc::new(ProcessScriptRunner),
    };
    let tasks = frontend_tasks(config, linux(), &collaborators).unwrap();
    let store = FileFingerprintStore::new(&config.project.cache_directory);
    let mut orchestrator = Orchestrator::new(tasks, collaborators.fs, Box::new(store)).unwrap();
    orchestrator.run(&[INSTALL_NODE]).await.unwrap()
}

#[tokio::test]
async fn install_node_task_is_up_to_date_across_processes() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let url_root = publish_mirror(&tmp.path().join("mirror"), ALL);
    let project = tmp.path().join("app");
    fs::create_dir_all(&project).unwrap();
    let config = ConfigFileBuilder::new(NODE_VERSION)
        .anchored_at(&project)
        .distribution_url_root(&url_root)
        .build();

    let first = install_node(&config).await;
    assert_eq!(first.outcome_of(INSTALL_NODE), Some(TaskOutcome::Executed));
    assert!(project.join("node/bin/node").is_file());

    let second = install_node(&config).await;
    assert_eq!(second.outcome_of(INSTALL_NODE), Some(TaskOutcome::UpToDate));

    // Executables gone but the directory kept: provisioned again.
    fs::remove_dir_all(project.join("node/bin")).unwrap();
    let third = install_node(&config).await;
    assert_eq!(third.outcome_of(INSTALL_NODE), Some(TaskOutcome::Executed));
    assert!(project.join("node/bin/corepack").is_file());
}
