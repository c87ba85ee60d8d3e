// src/fingerprint/store.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::engine::TaskName;
use crate::fingerprint::Fingerprint;

/// File name of the persisted store inside the cache directory.
pub const FINGERPRINT_FILE_NAME: &str = "fingerprints.json";

/// Abstract storage for task fingerprints, keyed by task name.
pub trait FingerprintStore: Send {
    fn load(&self, task: &str) -> Result<Option<Fingerprint>>;
    fn save(&mut self, task: &str, fingerprint: &Fingerprint) -> Result<()>;
    fn remove(&mut self, task: &str) -> Result<()>;
    /// Remove fingerprints for tasks that are not in the `active_tasks` list.
    fn prune(&mut self, active_tasks: &[&str]) -> Result<()>;
}

/// Stores fingerprints in `<cache>/fingerprints.json`.
///
/// Every update rewrites the whole file through a temporary file that is
/// atomically persisted over the previous one.
pub struct FileFingerprintStore {
    path: PathBuf,
}

impl FileFingerprintStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(FINGERPRINT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> Result<BTreeMap<TaskName, Fingerprint>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading fingerprint store at {:?}", self.path))?;

        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(err) => {
                // Unreadable records can never match; start over.
                warn!(
                    path = ?self.path,
                    error = %err,
                    "fingerprint store is corrupted; ignoring its records"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn save_all(&self, map: &BTreeMap<TaskName, Fingerprint>) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("fingerprint store path {:?} has no parent", self.path))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("creating fingerprint directory at {:?}", parent))?;

        let content = serde_json::to_string_pretty(map)?;

        let mut temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temporary file in {:?}", parent))?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&self.path)
            .with_context(|| format!("persisting fingerprint store at {:?}", self.path))?;

        Ok(())
    }
}

impl FingerprintStore for FileFingerprintStore {
    fn load(&self, task: &str) -> Result<Option<Fingerprint>> {
        let map = self.load_all()?;
        Ok(map.get(task).cloned())
    }

    fn save(&mut self, task: &str, fingerprint: &Fingerprint) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(task.to_string(), fingerprint.clone());
        self.save_all(&map)?;
        debug!(task = %task, inputs = %fingerprint.inputs, "stored task fingerprint (file)");
        Ok(())
    }

    fn remove(&mut self, task: &str) -> Result<()> {
        let mut map = self.load_all()?;
        if map.remove(task).is_some() {
            self.save_all(&map)?;
            debug!(task = %task, "discarded task fingerprint (file)");
        }
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        let mut map = self.load_all()?;
        let initial_len = map.len();
        map.retain(|k, _| active_tasks.contains(&k.as_str()));

        if map.len() < initial_len {
            self.save_all(&map)?;
            info!(
                removed = initial_len - map.len(),
                "pruned stale task fingerprints (file)"
            );
        }
        Ok(())
    }
}

/// Stores fingerprints in memory only.
///
/// Clones share the same records, which lets a test keep a handle on the
/// store it moved into an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct MemoryFingerprintStore {
    map: Arc<Mutex<BTreeMap<TaskName, Fingerprint>>>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<TaskName, Fingerprint>>> {
        self.map
            .lock()
            .map_err(|_| anyhow!("fingerprint store lock poisoned"))
    }

    pub fn contains(&self, task: &str) -> bool {
        self.records().map(|m| m.contains_key(task)).unwrap_or(false)
    }

    /// Overwrite a record directly.
    pub fn insert(&self, task: &str, fingerprint: Fingerprint) -> Result<()> {
        self.records()?.insert(task.to_string(), fingerprint);
        Ok(())
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn load(&self, task: &str) -> Result<Option<Fingerprint>> {
        Ok(self.records()?.get(task).cloned())
    }

    fn save(&mut self, task: &str, fingerprint: &Fingerprint) -> Result<()> {
        self.records()?.insert(task.to_string(), fingerprint.clone());
        debug!(task = %task, inputs = %fingerprint.inputs, "stored task fingerprint (memory)");
        Ok(())
    }

    fn remove(&mut self, task: &str) -> Result<()> {
        self.records()?.remove(task);
        Ok(())
    }

    fn prune(&mut self, active_tasks: &[&str]) -> Result<()> {
        let mut map = self.records()?;
        let initial_len = map.len();
        map.retain(|k, _| active_tasks.contains(&k.as_str()));
        if map.len() < initial_len {
            info!(
                removed = initial_len - map.len(),
                "pruned stale task fingerprints (memory)"
            );
        }
        Ok(())
    }
}
