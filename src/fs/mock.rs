// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
    Symlink(PathBuf),
}

/// In-memory filesystem shared between clones.
///
/// Clones see the same tree, so a test can hand one clone to the code under
/// test and keep another to arrange or inspect state. Symbolic links are
/// stored but never followed.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

fn parent_of(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        Some(parent) => Some(parent),
        None => None,
    }
}

fn child_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = BTreeMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        files.insert(path.clone(), MockEntry::File(content.into()));
        Self::link_to_parent(&mut files, &path);
    }

    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl Into<PathBuf>) {
        let link = link.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        files.insert(link.clone(), MockEntry::Symlink(target.into()));
        Self::link_to_parent(&mut files, &link);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        Self::ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Raw bytes of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(path.as_ref()) {
            Some(MockEntry::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    fn ensure_dir_entry(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            Self::link_to_parent(files, path);
        }
    }

    fn link_to_parent(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = parent_of(path) else {
            return;
        };
        if parent == path {
            return;
        }
        Self::ensure_dir_entry(files, parent);
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (files.get_mut(parent), child_name(path))
        {
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }

    fn unlink_from_parent(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        if let (Some(parent), Some(name)) = (parent_of(path), child_name(path)) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                children.retain(|c| c != &name);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(MockEntry::Symlink(_)) => Err(anyhow!("Is a symlink: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(MockEntry::Symlink(_)) => Err(anyhow!("Is a symlink: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if let Some(MockEntry::File(_)) = files.get(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        Self::ensure_dir_entry(&mut files, path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(_)) | Some(MockEntry::Symlink(_)) => {
                files.remove(path);
                Self::unlink_from_parent(&mut files, path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if !matches!(files.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        files.retain(|p, _| !p.starts_with(path));
        Self::unlink_from_parent(&mut files, path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if !files.contains_key(from) {
            return Err(anyhow!("File not found: {:?}", from));
        }
        if files.contains_key(to) {
            return Err(anyhow!("Destination exists: {:?}", to));
        }

        let moved: Vec<PathBuf> = files
            .keys()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        for old in moved {
            if let (Some(entry), Ok(rest)) = (files.remove(&old), old.strip_prefix(from)) {
                let new = if rest.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rest)
                };
                files.insert(new, entry);
            }
        }

        Self::unlink_from_parent(&mut files, from);
        Self::link_to_parent(&mut files, to);
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let content = {
            let files = self.files.lock().unwrap();
            match files.get(from) {
                Some(MockEntry::File(content)) => content.clone(),
                Some(MockEntry::Dir(_)) => return Err(anyhow!("Is a directory: {:?}", from)),
                Some(MockEntry::Symlink(_)) => return Err(anyhow!("Is a symlink: {:?}", from)),
                None => return Err(anyhow!("File not found: {:?}", from)),
            }
        };
        self.add_file(to, content);
        Ok(())
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Symlink(_)))
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Symlink(target)) => Ok(target.clone()),
            _ => Err(anyhow!("Not a symlink: {:?}", path)),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        if self.exists(link) {
            return Err(anyhow!("File exists: {:?}", link));
        }
        self.add_symlink(link, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_whole_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("staging/node/bin/node", b"node");
        fs.add_file("staging/node/bin/npm", b"npm");

        fs.rename(Path::new("staging/node"), Path::new("install/node"))
            .unwrap();

        assert!(fs.is_file(Path::new("install/node/bin/node")));
        assert!(fs.is_file(Path::new("install/node/bin/npm")));
        assert!(!fs.exists(Path::new("staging/node")));
        assert!(fs.read_dir(Path::new("staging")).unwrap().is_empty());
        assert_eq!(
            fs.read_dir(Path::new("install")).unwrap(),
            vec![PathBuf::from("install/node")]
        );
    }

    #[test]
    fn copy_dir_all_recreates_links() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/lib/corepack.js", b"js");
        fs.add_symlink("dist/bin/corepack", "../lib/corepack.js");

        crate::fs::copy_dir_all(&fs, Path::new("dist"), Path::new("node")).unwrap();

        assert!(fs.is_symlink(Path::new("node/bin/corepack")));
        assert_eq!(
            fs.read_link(Path::new("node/bin/corepack")).unwrap(),
            PathBuf::from("../lib/corepack.js")
        );
        assert!(fs.is_file(Path::new("node/lib/corepack.js")));
    }

    #[test]
    fn remove_dir_all_drops_descendants_only() {
        let fs = MockFileSystem::new();
        fs.add_file("a/b/c.txt", b"c");
        fs.add_file("a/bb.txt", b"bb");

        fs.remove_dir_all(Path::new("a/b")).unwrap();

        assert!(!fs.exists(Path::new("a/b/c.txt")));
        assert!(fs.is_file(Path::new("a/bb.txt")));
        assert_eq!(
            fs.read_dir(Path::new("a")).unwrap(),
            vec![PathBuf::from("a/bb.txt")]
        );
    }
}
