// src/exec/runner.rs

//! Script execution.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{FrontdagError, Result};

/// One process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Variables set on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl ScriptInvocation {
    pub fn new(executable: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Space-joined command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs an executable and reports its exit code.
///
/// Output is logged, never interpreted.
pub trait ScriptRunner: Send + Sync + Debug {
    fn run(&self, invocation: ScriptInvocation) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + '_>>;
}

/// Turn a non-zero exit code into [`FrontdagError::ActionFailure`].
pub fn check_exit(task: &str, code: i32) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(FrontdagError::ActionFailure {
            task: task.to_string(),
            code,
        })
    }
}

/// Runs scripts as child processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessScriptRunner;

impl ScriptRunner for ProcessScriptRunner {
    fn run(&self, invocation: ScriptInvocation) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + '_>> {
        Box::pin(async move {
            let command_line = invocation.display();
            info!(cmd = %command_line, cwd = %invocation.working_dir.display(), "starting script");

            let mut child = Command::new(&invocation.executable)
                .args(&invocation.args)
                .current_dir(&invocation.working_dir)
                .envs(&invocation.env)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("spawning '{command_line}'"))?;

            let stdout = child.stdout.take().map(|out| forward_lines(out, false));
            let stderr = child.stderr.take().map(|err| forward_lines(err, true));

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for '{command_line}'"))?;

            // Drain the readers so no trailing output is lost.
            for handle in [stdout, stderr].into_iter().flatten() {
                let _ = handle.await;
            }

            let code = status.code().unwrap_or(-1);
            info!(cmd = %command_line, exit_code = code, "script exited");
            Ok(code)
        })
    }
}

fn forward_lines<R>(reader: R, is_stderr: bool) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if is_stderr => warn!(target: "frontdag::script", "{line}"),
                Ok(Some(line)) => info!(target: "frontdag::script", "{line}"),
                Ok(None) => break,
                Err(err) => {
                    debug!(error = %err, "stopped reading script output");
                    break;
                }
            }
        }
    })
}
