// src/exec/mod.rs

//! Process execution layer.
//!
//! Task actions never spawn processes directly; they go through the
//! [`ScriptRunner`] trait so tests can replace it with a fake that records
//! invocations. [`ProcessScriptRunner`] is the production implementation.

pub mod runner;

pub use runner::{ProcessScriptRunner, ScriptInvocation, ScriptRunner, check_exit};
