// tests/error_handling.rs

use std::io::Write;
use std::sync::Arc;

use frontdag::config::load_and_validate;
use frontdag::dag::TaskDescriptor;
use frontdag::distribution::{Arch, Os, Platform};
use frontdag::engine::Orchestrator;
use frontdag::errors::FrontdagError;
use frontdag::fingerprint::MemoryFingerprintStore;
use frontdag::fs::MockFileSystem;
use tempfile::{NamedTempFile, TempDir};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn missing_node_version_returns_config_error() {
    let file = config_file(
        r#"
[project]
directory = "web"
"#,
    );

    match load_and_validate(file.path()) {
        Err(FrontdagError::ConfigError(msg)) => assert!(msg.contains("version")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn prerelease_node_version_returns_config_error() {
    let file = config_file(
        r#"
[node]
version = "21.0.0-rc.1"
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, FrontdagError::ConfigError(msg) if msg.contains("release version")));
}

#[test]
fn malformed_toml_returns_toml_error() {
    let file = config_file("[node\nversion = 20");

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, FrontdagError::TomlError(_)));
}

#[test]
fn missing_file_returns_config_error() {
    let dir = TempDir::new().unwrap();
    let err = load_and_validate(dir.path().join("Frontdag.toml")).unwrap_err();
    assert!(matches!(err, FrontdagError::ConfigError(msg) if msg.contains("cannot read")));
}

#[test]
fn relative_paths_are_anchored_at_the_config_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Frontdag.toml");
    std::fs::write(
        &path,
        r#"
[node]
version = "20.11.1"
install_directory = "tools/node"

[project]
directory = "web"
fingerprint_storage = "memory"

[scripts]
assemble = "run build"

[environment]
CI = "true"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();

    let web = dir.path().join("web");
    assert_eq!(cfg.project.directory, web);
    assert_eq!(cfg.node.install_directory, web.join("tools/node"));
    assert_eq!(cfg.project.cache_directory, web.join(".frontdag"));
    assert_eq!(cfg.manifest_path(), web.join("package.json"));
    assert_eq!(cfg.node_directory(), web.join("tools/node"));
    assert_eq!(cfg.environment["CI"], "true");
}

#[test]
fn unsupported_platform_is_reported_by_name() {
    let err = Platform::from_names("freebsd", "x86_64").unwrap_err();
    assert!(matches!(err, FrontdagError::UnsupportedPlatform(msg) if msg.contains("freebsd")));

    let err = Platform::new(Os::Windows, Arch::Armv7l).unwrap_err();
    assert!(matches!(err, FrontdagError::UnsupportedPlatform(_)));
}

#[test]
fn dag_cycle_returns_structured_error() {
    let tasks = vec![
        TaskDescriptor::builder("A").after("B").build(),
        TaskDescriptor::builder("B").after("A").build(),
    ];

    let result = Orchestrator::new(
        tasks,
        Arc::new(MockFileSystem::new()),
        Box::new(MemoryFingerprintStore::new()),
    );

    match result {
        Err(FrontdagError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_dependency_returns_config_error() {
    let tasks = vec![TaskDescriptor::builder("A").after("NonExistent").build()];

    let err = Orchestrator::new(
        tasks,
        Arc::new(MockFileSystem::new()),
        Box::new(MemoryFingerprintStore::new()),
    )
    .unwrap_err();

    match err {
        FrontdagError::ConfigError(msg) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        e => panic!("Expected ConfigError, got: {:?}", e),
    }
}
