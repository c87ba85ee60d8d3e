use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use frontdag::dag::TaskAction;
use frontdag::distribution::DistributionDescriptor;
use frontdag::errors::{FrontdagError, Result};
use frontdag::exec::{ScriptInvocation, ScriptRunner};
use frontdag::frontend::PackageManagerKind;
use frontdag::fs::{FileSystem, MockFileSystem};
use frontdag::install::DistributionFetcher;
use url::Url;

/// A fake script runner that:
/// - records every invocation
/// - mimics `corepack enable` and `<pm> install` on a [`MockFileSystem`]
/// - returns configured exit codes
#[derive(Debug, Clone)]
pub struct FakeScriptRunner {
    fs: MockFileSystem,
    invocations: Arc<Mutex<Vec<ScriptInvocation>>>,
    /// `(argument prefix, exit code)`, first match wins.
    exit_codes: Arc<Mutex<Vec<(String, i32)>>>,
}

impl FakeScriptRunner {
    pub fn new(fs: &MockFileSystem) -> Self {
        Self {
            fs: fs.clone(),
            invocations: Arc::new(Mutex::new(Vec::new())),
            exit_codes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Exit with `code` when the space-joined arguments start with `prefix`.
    /// A failing invocation has no effect on the filesystem.
    pub fn fail_on(&self, prefix: &str, code: i32) {
        self.exit_codes
            .lock()
            .unwrap()
            .push((prefix.to_string(), code));
    }

    pub fn clear_failures(&self) {
        self.exit_codes.lock().unwrap().clear();
    }

    pub fn invocations(&self) -> Vec<ScriptInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Space-joined arguments of every invocation, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|inv| inv.args.join(" "))
            .collect()
    }

    pub fn reset(&self) {
        self.invocations.lock().unwrap().clear();
    }

    fn exit_code_for(&self, invocation: &ScriptInvocation) -> i32 {
        let line = invocation.args.join(" ");
        self.exit_codes
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0)
    }

    fn simulate(&self, invocation: &ScriptInvocation) {
        let program = invocation
            .executable
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        match invocation.args.first().map(String::as_str) {
            Some("enable") if program == "corepack" => {
                let bin = invocation.executable.parent().unwrap_or(Path::new("."));
                for name in &invocation.args[1..] {
                    if let Ok(kind) = PackageManagerKind::from_str(name) {
                        for shim in kind.shim_names() {
                            self.fs.add_file(bin.join(shim), format!("corepack shim for {shim}"));
                        }
                    }
                }
            }
            Some("install") => {
                self.fs.add_file(
                    invocation.working_dir.join("node_modules/.modules.txt"),
                    format!("installed by {program}"),
                );
            }
            _ => {}
        }
    }
}

impl ScriptRunner for FakeScriptRunner {
    fn run(
        &self,
        invocation: ScriptInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + '_>> {
        Box::pin(async move {
            let code = self.exit_code_for(&invocation);
            if code == 0 {
                self.simulate(&invocation);
            }
            self.invocations.lock().unwrap().push(invocation);
            Ok(code)
        })
    }
}

/// A fake fetcher that "extracts" a Node.js tree into a [`MockFileSystem`].
#[derive(Debug, Clone)]
pub struct FakeFetcher {
    fs: MockFileSystem,
    root_entry: String,
    executables: Vec<PathBuf>,
    omitted: Arc<Mutex<Vec<PathBuf>>>,
    downloads: Arc<Mutex<Vec<Url>>>,
    fail_downloads: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn new(fs: &MockFileSystem, descriptor: &DistributionDescriptor) -> Self {
        Self {
            fs: fs.clone(),
            root_entry: descriptor.root_entry.clone(),
            executables: descriptor.executables.clone(),
            omitted: Arc::new(Mutex::new(Vec::new())),
            downloads: Arc::new(Mutex::new(Vec::new())),
            fail_downloads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Leave `executable` (relative to the installation root) out of the
    /// extracted tree.
    pub fn omit(&self, executable: impl Into<PathBuf>) {
        self.omitted.lock().unwrap().push(executable.into());
    }

    pub fn restore_all(&self) {
        self.omitted.lock().unwrap().clear();
    }

    /// Fail the next `count` downloads.
    pub fn fail_next_downloads(&self, count: usize) {
        self.fail_downloads.store(count, Ordering::SeqCst);
    }

    pub fn downloads(&self) -> Vec<Url> {
        self.downloads.lock().unwrap().clone()
    }

    /// `node-v22.1.0-linux-x64` for `.../node-v22.1.0-linux-x64.tar.gz`.
    fn root_entry_of(archive: &Path) -> Option<String> {
        let name = archive.file_name()?.to_str()?;
        [".tar.gz", ".zip"]
            .iter()
            .find_map(|ext| name.strip_suffix(ext))
            .map(str::to_string)
    }
}

impl DistributionFetcher for FakeFetcher {
    fn download(&self, url: &Url, destination: &Path) -> Result<()> {
        let remaining = self.fail_downloads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_downloads.store(remaining - 1, Ordering::SeqCst);
            return Err(FrontdagError::DownloadError {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.downloads.lock().unwrap().push(url.clone());
        self.fs.add_file(destination, url.as_str());
        Ok(())
    }

    fn extract(&self, archive: &Path, target: &Path) -> Result<()> {
        if !self.fs.is_file(archive) {
            return Err(FrontdagError::ExtractionError {
                archive: archive.to_path_buf(),
                reason: "archive missing".to_string(),
            });
        }
        let omitted = self.omitted.lock().unwrap().clone();
        let root_entry = Self::root_entry_of(archive).unwrap_or_else(|| self.root_entry.clone());
        let root = target.join(&root_entry);
        self.fs.create_dir_all(&root)?;
        for exe in self.executables.iter().filter(|e| !omitted.contains(e)) {
            self.fs
                .add_file(root.join(exe), format!("{root_entry} {}", exe.display()));
        }
        self.fs.add_file(root.join("README.md"), "Node.js");
        Ok(())
    }
}

/// Action that writes fixed content to one file and counts its runs.
#[derive(Debug, Clone)]
pub struct RecordingAction {
    fs: MockFileSystem,
    output: Option<PathBuf>,
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingAction {
    pub fn writing(fs: &MockFileSystem, output: impl Into<PathBuf>) -> Self {
        Self {
            fs: fs.clone(),
            output: Some(output.into()),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    pub fn failing(fs: &MockFileSystem) -> Self {
        Self {
            fs: fs.clone(),
            output: None,
            calls: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TaskAction for RecordingAction {
    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FrontdagError::ActionFailure {
                    task: "recording".to_string(),
                    code: 1,
                });
            }
            if let Some(output) = &self.output {
                self.fs.write(output, b"built")?;
            }
            Ok(())
        })
    }
}
