// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod distribution;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fingerprint;
pub mod frontend;
pub mod fs;
pub mod install;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::distribution::Platform;
use crate::engine::{BuildReport, Orchestrator, TaskOutcome};
use crate::exec::ProcessScriptRunner;
use crate::fingerprint::{FileFingerprintStore, FingerprintStore, MemoryFingerprintStore};
use crate::frontend::{Collaborators, frontend_tasks};
use crate::fs::RealFileSystem;
use crate::install::HttpDistributionFetcher;
use crate::types::FingerprintStorageMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - platform detection and task registration
/// - the fingerprint store
/// - the orchestrator and its production collaborators
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    if let Some(mode) = args.fingerprint_storage {
        cfg.project.fingerprint_storage = mode;
    }

    let platform = Platform::current()?;
    let collaborators = Collaborators {
        fs: Arc::new(RealFileSystem),
        fetcher: Arc::new(HttpDistributionFetcher::default()),
        runner: Arc::new(ProcessScriptRunner),
    };
    let tasks = frontend_tasks(&cfg, platform, &collaborators)?;
    let mut orchestrator = Orchestrator::new(tasks, collaborators.fs.clone(), fingerprint_store(&cfg))?;

    let targets: Vec<&str> = args.tasks.iter().map(String::as_str).collect();

    if args.dry_run {
        print_dry_run(&cfg, &orchestrator, &targets);
        return Ok(());
    }

    info!(?targets, %platform, "starting build");
    let report = orchestrator.run(&targets).await?;
    print_summary(&orchestrator, &report);

    if !report.is_success() {
        bail!(
            "{} task(s) failed",
            report.with_outcome(TaskOutcome::Failed).len()
        );
    }
    Ok(())
}

fn fingerprint_store(cfg: &ConfigFile) -> Box<dyn FingerprintStore> {
    match cfg.project.fingerprint_storage {
        FingerprintStorageMode::File => {
            Box::new(FileFingerprintStore::new(&cfg.project.cache_directory))
        }
        FingerprintStorageMode::Memory => Box::new(MemoryFingerprintStore::new()),
    }
}

/// One line per task in the graph: outcome, or `IGNORED` when the task was
/// not part of the invocation.
fn print_summary(orchestrator: &Orchestrator, report: &BuildReport) {
    for name in orchestrator.graph().topological_order() {
        let label = match report.outcome_of(&name) {
            Some(TaskOutcome::Executed) => "EXECUTED",
            Some(TaskOutcome::UpToDate) => "UP-TO-DATE",
            Some(TaskOutcome::Skipped) => "SKIPPED",
            Some(TaskOutcome::Failed) => "FAILED",
            Some(TaskOutcome::Blocked) => "BLOCKED",
            None => "IGNORED",
        };
        match report.error_of(&name) {
            Some(err) => eprintln!("{label:>10}  {name}: {err}"),
            None => eprintln!("{label:>10}  {name}"),
        }
    }
}

/// Simple dry-run output: print tasks, deps and gates.
fn print_dry_run(cfg: &ConfigFile, orchestrator: &Orchestrator, targets: &[&str]) {
    println!("frontdag dry-run");
    println!("  node.version = {}", cfg.node.version);
    println!("  node.directory = {}", cfg.node_directory().display());
    println!("  project.directory = {}", cfg.project.directory.display());
    println!(
        "  project.fingerprint_storage = {:?}",
        cfg.project.fingerprint_storage
    );
    println!("  targets = {targets:?}");
    println!();

    let graph = orchestrator.graph();
    println!("tasks ({}):", graph.tasks().count());
    for name in graph.topological_order() {
        println!("  - {name}");
        let deps = graph.dependencies_of(&name);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        if let Some(task) = orchestrator.task(&name) {
            if let Some(reason) = &task.disabled {
                println!("      disabled: {reason}");
            }
            if let Some(precondition) = &task.precondition {
                println!("      only if: {}", precondition.reason());
            }
            if !task.outputs.is_empty() {
                let outputs: Vec<_> = task.outputs.paths().map(|p| p.display().to_string()).collect();
                println!("      outputs: {outputs:?}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
