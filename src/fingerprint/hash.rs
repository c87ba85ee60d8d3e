// src/fingerprint/hash.rs

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fingerprint::spec::{InputSpec, OutputSpec, PropertyValue};
use crate::fingerprint::Fingerprint;
use crate::fs::FileSystem;

const TAG_FILE: u8 = b'F';
const TAG_DIR: u8 = b'D';
const TAG_ABSENT: u8 = b'-';
const TAG_LINK: u8 = b'L';
/// A path declared as a file that is a directory (or the other way round).
const TAG_WRONG_KIND: u8 = b'!';

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// One entry below a hashed directory.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DirEntryKind {
    Dir,
    File(String),
    /// Symbolic link, by its stored target. Never descended into.
    Link(String),
}

/// Hash a directory tree: sorted relative paths, entry kinds and file content.
///
/// Links are hashed by their target text, so dangling links and links back
/// to an ancestor are fine. An empty directory hashes to the digest of an
/// empty listing, which never equals the "absent" sentinel used by
/// [`compute_fingerprint`].
pub fn compute_dir_hash(fs: &dyn FileSystem, root: &Path) -> Result<String> {
    let mut entries: Vec<(String, DirEntryKind)> = Vec::new();
    collect_dir_entries(fs, root, root, &mut entries)?;
    entries.sort();

    let mut hasher = Hasher::new();
    for (rel, kind) in entries.iter() {
        match kind {
            DirEntryKind::File(hash) => {
                hasher.update(&[TAG_FILE]);
                update_field(&mut hasher, rel.as_bytes());
                update_field(&mut hasher, hash.as_bytes());
            }
            DirEntryKind::Dir => {
                hasher.update(&[TAG_DIR]);
                update_field(&mut hasher, rel.as_bytes());
            }
            DirEntryKind::Link(target) => {
                hasher.update(&[TAG_LINK]);
                update_field(&mut hasher, rel.as_bytes());
                update_field(&mut hasher, target.as_bytes());
            }
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(dir = ?root, entries = entries.len(), hash = %hash, "computed directory hash");
    Ok(hash)
}

fn collect_dir_entries(
    fs: &dyn FileSystem,
    root: &Path,
    dir: &Path,
    out: &mut Vec<(String, DirEntryKind)>,
) -> Result<()> {
    for entry in fs.read_dir(dir)? {
        let rel = relative_key(root, &entry);
        if fs.is_symlink(&entry) {
            let target = fs.read_link(&entry)?;
            out.push((rel, DirEntryKind::Link(target.to_string_lossy().into_owned())));
        } else if fs.is_dir(&entry) {
            out.push((rel, DirEntryKind::Dir));
            collect_dir_entries(fs, root, &entry, out)?;
        } else {
            let hash = compute_file_hash(fs, &entry)?;
            out.push((rel, DirEntryKind::File(hash)));
        }
    }
    Ok(())
}

/// Platform-independent key for a path below `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Length-prefixed write so that adjacent fields can never run together.
fn update_field(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn sorted_unique(paths: &[PathBuf]) -> Vec<&PathBuf> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Compute the fingerprint of a task's declared inputs and outputs.
///
/// Fails if a required input file or directory is missing or unreadable.
pub fn compute_fingerprint(
    fs: &dyn FileSystem,
    inputs: &InputSpec,
    outputs: &OutputSpec,
) -> Result<Fingerprint> {
    Ok(Fingerprint {
        inputs: hash_inputs(fs, inputs)?,
        outputs: hash_outputs(fs, outputs)?,
    })
}

fn hash_inputs(fs: &dyn FileSystem, spec: &InputSpec) -> Result<String> {
    let mut hasher = Hasher::new();

    update_field(&mut hasher, b"files");
    for path in sorted_unique(&spec.files) {
        if !fs.is_file(path) {
            return Err(anyhow!("declared input file {:?} is missing or not a file", path));
        }
        update_field(&mut hasher, path.to_string_lossy().as_bytes());
        hasher.update(&[TAG_FILE]);
        update_field(&mut hasher, compute_file_hash(fs, path)?.as_bytes());
    }

    update_field(&mut hasher, b"optional_files");
    for path in sorted_unique(&spec.optional_files) {
        update_field(&mut hasher, path.to_string_lossy().as_bytes());
        if fs.is_file(path) {
            hasher.update(&[TAG_FILE]);
            update_field(&mut hasher, compute_file_hash(fs, path)?.as_bytes());
        } else if fs.exists(path) {
            hasher.update(&[TAG_WRONG_KIND]);
        } else {
            hasher.update(&[TAG_ABSENT]);
        }
    }

    update_field(&mut hasher, b"directories");
    for path in sorted_unique(&spec.directories) {
        if !fs.is_dir(path) {
            return Err(anyhow!(
                "declared input directory {:?} is missing or not a directory",
                path
            ));
        }
        update_field(&mut hasher, path.to_string_lossy().as_bytes());
        hasher.update(&[TAG_DIR]);
        update_field(&mut hasher, compute_dir_hash(fs, path)?.as_bytes());
    }

    update_field(&mut hasher, b"properties");
    for (name, value) in spec.properties.iter() {
        update_field(&mut hasher, name.as_bytes());
        match value {
            PropertyValue::Absent => {
                hasher.update(&[TAG_ABSENT]);
            }
            PropertyValue::Text(text) => {
                hasher.update(b"T");
                update_field(&mut hasher, text.as_bytes());
            }
            PropertyValue::List(items) => {
                hasher.update(b"L");
                hasher.update(&(items.len() as u64).to_le_bytes());
                for item in items {
                    update_field(&mut hasher, item.as_bytes());
                }
            }
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}

fn hash_outputs(fs: &dyn FileSystem, spec: &OutputSpec) -> Result<String> {
    let mut hasher = Hasher::new();

    update_field(&mut hasher, b"files");
    for path in sorted_unique(&spec.files) {
        update_field(&mut hasher, path.to_string_lossy().as_bytes());
        if fs.is_file(path) {
            hasher.update(&[TAG_FILE]);
            update_field(&mut hasher, compute_file_hash(fs, path)?.as_bytes());
        } else if fs.exists(path) {
            hasher.update(&[TAG_WRONG_KIND]);
        } else {
            hasher.update(&[TAG_ABSENT]);
        }
    }

    update_field(&mut hasher, b"directories");
    for path in sorted_unique(&spec.directories) {
        update_field(&mut hasher, path.to_string_lossy().as_bytes());
        if fs.is_dir(path) {
            hasher.update(&[TAG_DIR]);
            update_field(&mut hasher, compute_dir_hash(fs, path)?.as_bytes());
        } else if fs.exists(path) {
            hasher.update(&[TAG_WRONG_KIND]);
        } else {
            hasher.update(&[TAG_ABSENT]);
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Declared outputs that are currently absent or of the wrong kind.
pub fn missing_outputs(fs: &dyn FileSystem, spec: &OutputSpec) -> Vec<PathBuf> {
    let files = spec.files.iter().filter(|p| !fs.is_file(p));
    let dirs = spec.directories.iter().filter(|p| !fs.is_dir(p));
    files.chain(dirs).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn outputs(files: &[&str], dirs: &[&str]) -> OutputSpec {
        OutputSpec {
            files: files.iter().map(PathBuf::from).collect(),
            directories: dirs.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn file_hash_matches_blake3_of_content() {
        let fs = MockFileSystem::new();
        fs.add_file("test.txt", b"hello world");

        let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
        assert_eq!(
            hash,
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn missing_output_and_empty_output_never_collide() {
        let fs = MockFileSystem::new();
        let spec = outputs(&["dist/out.txt"], &[]);

        let absent = compute_fingerprint(&fs, &InputSpec::default(), &spec).unwrap();
        fs.add_file("dist/out.txt", b"");
        let empty = compute_fingerprint(&fs, &InputSpec::default(), &spec).unwrap();

        assert_ne!(absent.outputs, empty.outputs);
        assert_eq!(absent.inputs, empty.inputs);
    }

    #[test]
    fn missing_output_dir_differs_from_empty_dir() {
        let fs = MockFileSystem::new();
        let spec = outputs(&[], &["node_modules"]);

        let absent = compute_fingerprint(&fs, &InputSpec::default(), &spec).unwrap();
        fs.add_dir("node_modules");
        let empty = compute_fingerprint(&fs, &InputSpec::default(), &spec).unwrap();

        assert_ne!(absent, empty);
        assert_eq!(missing_outputs(&fs, &spec), Vec::<PathBuf>::new());
    }

    #[test]
    fn file_set_order_is_irrelevant() {
        let fs = MockFileSystem::new();
        fs.add_file("a.txt", b"a");
        fs.add_file("b.txt", b"b");

        let ab = InputSpec {
            files: vec!["a.txt".into(), "b.txt".into()],
            ..Default::default()
        };
        let ba = InputSpec {
            files: vec!["b.txt".into(), "a.txt".into()],
            ..Default::default()
        };

        let none = OutputSpec::default();
        assert_eq!(
            compute_fingerprint(&fs, &ab, &none).unwrap(),
            compute_fingerprint(&fs, &ba, &none).unwrap()
        );
    }

    #[test]
    fn property_order_is_significant() {
        let fs = MockFileSystem::new();
        let first = InputSpec {
            properties: vec![
                ("a".into(), "1".into()),
                ("b".into(), "2".into()),
            ],
            ..Default::default()
        };
        let second = InputSpec {
            properties: vec![
                ("b".into(), "2".into()),
                ("a".into(), "1".into()),
            ],
            ..Default::default()
        };

        let none = OutputSpec::default();
        assert_ne!(
            compute_fingerprint(&fs, &first, &none).unwrap(),
            compute_fingerprint(&fs, &second, &none).unwrap()
        );
    }

    #[test]
    fn list_elements_do_not_run_together() {
        let fs = MockFileSystem::new();
        let split = InputSpec {
            properties: vec![("args".into(), vec!["ab".to_string(), "c".to_string()].into())],
            ..Default::default()
        };
        let joined = InputSpec {
            properties: vec![("args".into(), vec!["a".to_string(), "bc".to_string()].into())],
            ..Default::default()
        };

        let none = OutputSpec::default();
        assert_ne!(
            compute_fingerprint(&fs, &split, &none).unwrap(),
            compute_fingerprint(&fs, &joined, &none).unwrap()
        );
    }

    #[test]
    fn missing_required_input_is_an_error() {
        let fs = MockFileSystem::new();
        let spec = InputSpec {
            files: vec!["package.json".into()],
            ..Default::default()
        };

        let err = compute_fingerprint(&fs, &spec, &OutputSpec::default()).unwrap_err();
        assert!(err.to_string().contains("package.json"));
    }

    #[test]
    fn optional_input_appearing_changes_fingerprint() {
        let fs = MockFileSystem::new();
        let spec = InputSpec {
            optional_files: vec!["yarn.lock".into()],
            ..Default::default()
        };

        let before = compute_fingerprint(&fs, &spec, &OutputSpec::default()).unwrap();
        fs.add_file("yarn.lock", b"");
        let after = compute_fingerprint(&fs, &spec, &OutputSpec::default()).unwrap();

        assert_ne!(before.inputs, after.inputs);
    }

    #[test]
    fn directory_hash_tracks_nested_content() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a/index.js", b"one");
        let before = compute_dir_hash(&fs, Path::new("src")).unwrap();

        fs.add_file("src/a/index.js", b"two");
        let after = compute_dir_hash(&fs, Path::new("src")).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn links_are_hashed_by_target() {
        let fs = MockFileSystem::new();
        fs.add_file("node_modules/tool/cli.js", b"cli");
        fs.add_symlink("node_modules/.bin/tool", "../tool/cli.js");
        let first = compute_dir_hash(&fs, Path::new("node_modules")).unwrap();

        fs.remove_file(Path::new("node_modules/.bin/tool")).unwrap();
        fs.add_symlink("node_modules/.bin/tool", "../tool/other.js");
        let retargeted = compute_dir_hash(&fs, Path::new("node_modules")).unwrap();

        fs.remove_file(Path::new("node_modules/.bin/tool")).unwrap();
        fs.add_file("node_modules/.bin/tool", b"../tool/cli.js");
        let plain_file = compute_dir_hash(&fs, Path::new("node_modules")).unwrap();

        assert_ne!(first, retargeted);
        assert_ne!(first, plain_file);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_and_looping_links_hash_on_disk() {
        use crate::fs::RealFileSystem;
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("node_modules");
        std::fs::create_dir_all(modules.join(".bin")).unwrap();
        std::fs::create_dir_all(modules.join("pkg")).unwrap();
        std::fs::write(modules.join("pkg/index.js"), "module.exports = 1").unwrap();
        symlink("../missing/cli.js", modules.join(".bin/tool")).unwrap();
        symlink("..", modules.join("pkg/self")).unwrap();

        let first = compute_dir_hash(&RealFileSystem, &modules).unwrap();
        let second = compute_dir_hash(&RealFileSystem, &modules).unwrap();
        assert_eq!(first, second);

        let spec = outputs(&[], &[modules.to_str().unwrap()]);
        assert!(compute_fingerprint(&RealFileSystem, &InputSpec::default(), &spec).is_ok());
    }
}
