//! Golden-file snapshots of serialized trees.
//!
//! A snapshot stores the uncoloured pretty rendering of a tree as lines, with
//! a SHA-256 hash of the content for quick comparison. Files are YAML, one per
//! snapshot, named `{name}.snap.yaml`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::debug::{format_tree, Palette};
use crate::result::{ProbeError, ProbeResult};
use crate::serializer::SerializedNode;

/// Set to `1` or `true` to rewrite snapshots instead of comparing
pub const UPDATE_ENV_VAR: &str = "TREE_PROBE_UPDATE_SNAPSHOTS";

/// Default snapshot directory, relative to the working directory
pub const DEFAULT_SNAPSHOT_DIR: &str = "__snapshots__";

/// Snapshot store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Overwrite stored snapshots on mismatch
    pub update_snapshots: bool,
    /// Directory holding snapshot files
    pub snapshot_dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            update_snapshots: false,
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
        }
    }
}

impl SnapshotConfig {
    /// Defaults with `TREE_PROBE_UPDATE_SNAPSHOTS` applied
    #[must_use]
    pub fn from_env() -> Self {
        let update = std::env::var(UPDATE_ENV_VAR)
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self::default().with_update(update)
    }

    /// Set update mode
    #[must_use]
    pub const fn with_update(mut self, update: bool) -> Self {
        self.update_snapshots = update;
        self
    }

    /// Set the snapshot directory
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }
}

/// Stored rendering of one tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Snapshot name
    pub name: String,
    /// SHA-256 of the content lines
    pub hash: String,
    /// Pretty-printed tree, one entry per line
    pub content: Vec<String>,
    /// Free-form annotations
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TreeSnapshot {
    /// Capture a serialized tree; `None` is stored as `null`
    #[must_use]
    pub fn from_tree(name: &str, tree: Option<&SerializedNode>) -> Self {
        let rendered = format_tree(tree, &Palette::plain());
        Self::from_lines(name, rendered.lines())
    }

    /// Capture raw lines
    #[must_use]
    pub fn from_lines<'a>(name: &str, lines: impl IntoIterator<Item = &'a str>) -> Self {
        let content: Vec<String> = lines.into_iter().map(ToString::to_string).collect();
        let hash = Self::compute_hash(&content);
        Self {
            name: name.to_string(),
            hash,
            content,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach an annotation
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    fn compute_hash(content: &[String]) -> String {
        let mut hasher = Sha256::new();
        for line in content {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    /// Same content as `other`
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.hash == other.hash
    }

    /// Line-by-line differences against `expected`
    #[must_use]
    pub fn diff(&self, expected: &Self) -> SnapshotDiff {
        let lines = self.content.len().max(expected.content.len());
        let changed_lines = (0..lines)
            .filter_map(|i| {
                let want = expected.content.get(i).map_or("", String::as_str);
                let got = self.content.get(i).map_or("", String::as_str);
                (want != got).then(|| LineDiff {
                    line_number: i,
                    expected: want.to_string(),
                    actual: got.to_string(),
                })
            })
            .collect();
        SnapshotDiff { changed_lines }
    }

    /// Write as YAML, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: &Path) -> ProbeResult<()> {
        let yaml = serde_yaml_ng::to_string(self).map_err(|e| ProbeError::SnapshotSerialization {
            message: format!("failed to encode snapshot: {e}"),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Read from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails.
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let yaml = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&yaml).map_err(|e| ProbeError::SnapshotSerialization {
            message: format!("failed to decode snapshot {}: {e}", path.display()),
        })
    }
}

/// Differences between two snapshots
#[derive(Debug, Clone, Default)]
pub struct SnapshotDiff {
    /// Lines that differ
    pub changed_lines: Vec<LineDiff>,
}

impl SnapshotDiff {
    /// Whether the snapshots have the same lines
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.changed_lines.is_empty()
    }
}

/// One differing line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// Line number, 0-indexed
    pub line_number: usize,
    /// Stored content
    pub expected: String,
    /// Current content
    pub actual: String,
}

impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identical() {
            return write!(f, "snapshots are identical");
        }
        for diff in &self.changed_lines {
            writeln!(f, "  line {}:", diff.line_number + 1)?;
            writeln!(f, "    - {}", diff.expected)?;
            writeln!(f, "    + {}", diff.actual)?;
        }
        Ok(())
    }
}

/// Directory of snapshot files
#[derive(Debug)]
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
    update_mode: bool,
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::from_config(&SnapshotConfig::default())
    }
}

impl SnapshotManager {
    /// Store snapshots under `snapshot_dir`
    #[must_use]
    pub fn new(snapshot_dir: &Path) -> Self {
        Self {
            snapshot_dir: snapshot_dir.to_path_buf(),
            update_mode: false,
        }
    }

    /// Build from a config
    #[must_use]
    pub fn from_config(config: &SnapshotConfig) -> Self {
        Self::new(&config.snapshot_dir).with_update_mode(config.update_snapshots)
    }

    /// Overwrite stored snapshots on mismatch
    #[must_use]
    pub const fn with_update_mode(mut self, update: bool) -> Self {
        self.update_mode = update;
        self
    }

    /// Snapshot directory
    #[must_use]
    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// File path for `name`
    #[must_use]
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.snapshot_dir.join(format!("{name}.snap.yaml"))
    }

    /// Whether `name` is stored
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.snapshot_path(name).exists()
    }

    /// Store a snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn save(&self, snapshot: &TreeSnapshot) -> ProbeResult<()> {
        snapshot.save(&self.snapshot_path(&snapshot.name))
    }

    /// Load a stored snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn load(&self, name: &str) -> ProbeResult<TreeSnapshot> {
        TreeSnapshot::load(&self.snapshot_path(name))
    }

    /// Compare `tree` with the stored snapshot, writing it when missing
    ///
    /// In update mode a mismatch overwrites the stored snapshot.
    ///
    /// # Errors
    ///
    /// `SnapshotMismatch` with a line diff when the content differs.
    pub fn assert_snapshot(&self, name: &str, tree: Option<&SerializedNode>) -> ProbeResult<()> {
        let actual = TreeSnapshot::from_tree(name, tree);
        let path = self.snapshot_path(name);

        if !path.exists() {
            tracing::debug!(snapshot = name, path = %path.display(), "writing new snapshot");
            return actual.save(&path);
        }

        let expected = TreeSnapshot::load(&path)?;
        if actual.matches(&expected) {
            return Ok(());
        }
        if self.update_mode {
            tracing::debug!(snapshot = name, "updating snapshot");
            return actual.save(&path);
        }
        Err(ProbeError::SnapshotMismatch {
            name: name.to_string(),
            diff: actual.diff(&expected).to_string(),
        })
    }

    /// Names of stored snapshots, sorted
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn list(&self) -> ProbeResult<Vec<String>> {
        if !self.snapshot_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let file_name = entry?.file_name();
            if let Some(name) = file_name
                .to_str()
                .and_then(|n| n.strip_suffix(".snap.yaml"))
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a stored snapshot; missing is fine
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    pub fn delete(&self, name: &str) -> ProbeResult<()> {
        let path = self.snapshot_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::fixtures::banana_types;
    use crate::session::render;
    use tempfile::TempDir;

    fn banana_tree() -> Option<SerializedNode> {
        let types = banana_types();
        render(Element::new(&types.banana)).unwrap().to_json()
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_from_tree_is_plain_and_hashed() {
            let snap = TreeSnapshot::from_tree("banana", banana_tree().as_ref());
            assert_eq!(snap.content[0], "<View>");
            assert!(snap.content.iter().all(|l| !l.contains('\u{1b}')));
            assert_eq!(snap.hash.len(), 64);
        }

        #[test]
        fn test_empty_tree_snapshot() {
            let snap = TreeSnapshot::from_tree("empty", None);
            assert_eq!(snap.content, vec!["null"]);
        }

        #[test]
        fn test_diff_reports_changed_lines() {
            let a = TreeSnapshot::from_lines("x", ["<View>", "  a", "</View>"]);
            let b = TreeSnapshot::from_lines("x", ["<View>", "  b", "</View>"]);
            let diff = b.diff(&a);
            assert_eq!(diff.changed_lines.len(), 1);
            assert_eq!(diff.changed_lines[0].expected, "  a");
            assert_eq!(diff.changed_lines[0].actual, "  b");
            assert!(a.diff(&a).is_identical());
        }

        #[test]
        fn test_yaml_round_trip_preserves_hash() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("nested/banana.snap.yaml");
            let snap = TreeSnapshot::from_tree("banana", banana_tree().as_ref())
                .with_metadata("source", "unit");
            snap.save(&path).unwrap();
            let loaded = TreeSnapshot::load(&path).unwrap();
            assert!(loaded.matches(&snap));
            assert_eq!(loaded.metadata.get("source").map(String::as_str), Some("unit"));
        }
    }

    mod manager_tests {
        use super::*;

        #[test]
        fn test_first_assert_writes_then_matches() {
            let dir = TempDir::new().unwrap();
            let manager = SnapshotManager::new(dir.path());
            let tree = banana_tree();
            assert!(!manager.exists("banana"));
            manager.assert_snapshot("banana", tree.as_ref()).unwrap();
            assert!(manager.exists("banana"));
            manager.assert_snapshot("banana", tree.as_ref()).unwrap();
        }

        #[test]
        fn test_mismatch_fails_with_diff() {
            let dir = TempDir::new().unwrap();
            let manager = SnapshotManager::new(dir.path());
            manager.assert_snapshot("tree", banana_tree().as_ref()).unwrap();
            let err = manager.assert_snapshot("tree", None).unwrap_err();
            match err {
                ProbeError::SnapshotMismatch { name, diff } => {
                    assert_eq!(name, "tree");
                    assert!(diff.contains("+ null"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_update_mode_overwrites() {
            let dir = TempDir::new().unwrap();
            let config = SnapshotConfig::default()
                .with_dir(dir.path())
                .with_update(true);
            let manager = SnapshotManager::from_config(&config);
            manager.assert_snapshot("tree", banana_tree().as_ref()).unwrap();
            manager.assert_snapshot("tree", None).unwrap();
            assert_eq!(manager.load("tree").unwrap().content, vec!["null"]);
        }

        #[test]
        fn test_list_and_delete() {
            let dir = TempDir::new().unwrap();
            let manager = SnapshotManager::new(dir.path());
            manager.save(&TreeSnapshot::from_lines("b", ["x"])).unwrap();
            manager.save(&TreeSnapshot::from_lines("a", ["y"])).unwrap();
            fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
            assert_eq!(manager.list().unwrap(), vec!["a", "b"]);
            manager.delete("a").unwrap();
            manager.delete("missing").unwrap();
            assert_eq!(manager.list().unwrap(), vec!["b"]);
        }

        #[test]
        fn test_list_missing_dir_is_empty() {
            let dir = TempDir::new().unwrap();
            let manager = SnapshotManager::new(&dir.path().join("absent"));
            assert!(manager.list().unwrap().is_empty());
        }
    }
}
