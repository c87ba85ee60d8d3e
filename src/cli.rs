// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::FingerprintStorageMode;

/// Command-line arguments for `frontdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "frontdag",
    version,
    about = "Provision Node.js and a package manager, then run frontend scripts incrementally.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Frontdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Frontdag.toml")]
    pub config: String,

    /// Tasks to run, together with everything they depend on.
    #[arg(value_name = "TASK", default_value = crate::frontend::INSTALL_FRONTEND)]
    pub tasks: Vec<String>,

    /// Override `[project].fingerprint_storage` (file or memory).
    #[arg(long, value_name = "MODE")]
    pub fingerprint_storage: Option<FingerprintStorageMode>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FRONTDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
