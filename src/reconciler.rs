//! Sync Reconciler: compares a local directory tree against the server's
//! catalog and decides what to pull and what to push.
//!
//! Walking excludes dotfiles and a fixed set of directory names that hold
//! the sync client's own bookkeeping rather than synced content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::catalog::FileMetadata;
use crate::error::SyncError;
use crate::transfer::TransferEngine;

const EXCLUDED_DIR_NAMES: &[&str] = &["storage", "target", ".git"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Local copy is missing or its digest differs from the server's; pull.
    Download { name: String },
    /// Local file has no server-side counterpart; push.
    Upload { name: String, local_path: PathBuf },
    /// Digests already agree; nothing to do.
    InSync { name: String },
}

/// Walks `root`, returning a map from relative file name to absolute path,
/// skipping hidden entries and [`EXCLUDED_DIR_NAMES`].
pub fn scan_local_tree(root: impl AsRef<Path>) -> HashMap<String, PathBuf> {
    let root = root.as_ref();
    let mut found = HashMap::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return false;
        }
        if entry.file_type().is_dir() && EXCLUDED_DIR_NAMES.contains(&name.as_ref()) {
            return false;
        }
        true
    });
    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            found.insert(rel.to_string_lossy().replace('\\', "/"), entry.path().to_path_buf());
        }
    }
    found
}

/// Produces the list of actions that brings `local` into agreement with
/// `remote`, under last-server-write-wins: when both a local file and a
/// server entry exist with different digests, the server's copy wins and a
/// download is produced rather than a conflicting upload.
pub fn plan(local: &HashMap<String, PathBuf>, remote: &[FileMetadata]) -> Result<Vec<ReconcileAction>, SyncError> {
    let mut actions = Vec::new();
    let remote_by_name: HashMap<&str, &FileMetadata> =
        remote.iter().map(|m| (m.name.as_str(), m)).collect();

    for (name, path) in local {
        match remote_by_name.get(name.as_str()) {
            Some(meta) => {
                let local_hash = TransferEngine::digest_file(path)?;
                if local_hash == meta.hash {
                    actions.push(ReconcileAction::InSync { name: name.clone() });
                } else {
                    actions.push(ReconcileAction::Download { name: name.clone() });
                }
            }
            None => actions.push(ReconcileAction::Upload {
                name: name.clone(),
                local_path: path.clone(),
            }),
        }
    }

    for meta in remote {
        if !local.contains_key(&meta.name) {
            actions.push(ReconcileAction::Download { name: meta.name.clone() });
        }
    }

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn meta(name: &str, hash: &str) -> FileMetadata {
        FileMetadata {
            name: name.into(),
            version: 1,
            hash: hash.into(),
            size: 0,
            deleted: false,
            timestamp: 0,
        }
    }

    #[test]
    fn scan_excludes_storage_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("storage")).unwrap();
        fs::write(dir.path().join("storage").join("ignored.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("ignored2.txt"), b"y").unwrap();

        let found = scan_local_tree(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("a.txt"));
    }

    #[test]
    fn new_remote_file_is_downloaded() {
        let local = HashMap::new();
        let remote = vec![meta("b.txt", "hash-b")];
        let actions = plan(&local, &remote).unwrap();
        assert_eq!(actions, vec![ReconcileAction::Download { name: "b.txt".into() }]);
    }

    #[test]
    fn local_only_file_is_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, b"local content").unwrap();
        let mut local = HashMap::new();
        local.insert("c.txt".to_string(), path.clone());

        let actions = plan(&local, &[]).unwrap();
        assert_eq!(
            actions,
            vec![ReconcileAction::Upload {
                name: "c.txt".into(),
                local_path: path,
            }]
        );
    }

    #[test]
    fn matching_digests_are_in_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.txt");
        fs::write(&path, b"same").unwrap();
        let hash = TransferEngine::digest_file(&path).unwrap();

        let mut local = HashMap::new();
        local.insert("d.txt".to_string(), path);
        let remote = vec![meta("d.txt", &hash)];

        let actions = plan(&local, &remote).unwrap();
        assert_eq!(actions, vec![ReconcileAction::InSync { name: "d.txt".into() }]);
    }

    #[test]
    fn mismatched_digest_prefers_server_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.txt");
        fs::write(&path, b"stale local copy").unwrap();

        let mut local = HashMap::new();
        local.insert("e.txt".to_string(), path);
        let remote = vec![meta("e.txt", "server-hash-differs")];

        let actions = plan(&local, &remote).unwrap();
        assert_eq!(actions, vec![ReconcileAction::Download { name: "e.txt".into() }]);
    }

    #[test]
    fn reapplying_plan_after_convergence_reaches_fixed_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, b"converged").unwrap();
        let hash = TransferEngine::digest_file(&path).unwrap();

        let mut local = HashMap::new();
        local.insert("f.txt".to_string(), path);
        let remote = vec![meta("f.txt", &hash)];

        let first = plan(&local, &remote).unwrap();
        let second = plan(&local, &remote).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|a| matches!(a, ReconcileAction::InSync { .. })));
    }
}
