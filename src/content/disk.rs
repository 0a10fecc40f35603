//! Local-disk content store.
//!
//! Content lives under a root directory with timestamp-based storage keys,
//! sharded into two-level subdirectories to keep listings small.

use super::{ContentStore, FileAttrs};
use crate::error::StoreError;
use crate::meta::idgen::base36;
use crate::types::StorageId;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub struct DiskStore {
    root: PathBuf,
    last_key: Mutex<u64>,
}

impl DiskStore {
    /// Open a disk store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            last_key: Mutex::new(0),
        })
    }

    /// Timestamp-based key, bumped past the clock when allocations collide.
    fn next_key(&self) -> StorageId {
        let mut last = self.last_key.lock();
        let mut millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        if millis <= *last {
            millis = *last + 1;
        }
        *last = millis;
        base36(millis)
    }

    fn path_for(&self, storage_id: &str) -> PathBuf {
        // Last two key characters spread entries across shard directories.
        let shard = if storage_id.len() >= 2 {
            &storage_id[storage_id.len() - 2..]
        } else {
            "00"
        };
        self.root.join(shard).join(storage_id)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentStore for DiskStore {
    fn store(&self, _file: &FileAttrs, src: &mut dyn Read) -> Result<StorageId, StoreError> {
        let storage_id = self.next_key();
        let path = self.path_for(&storage_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&path)?;
        if let Err(e) = io::copy(src, &mut out) {
            // A half-written object is unreachable garbage; drop it.
            drop(out);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        out.flush()?;
        tracing::debug!(storage_id = %storage_id, path = %path.display(), "stored content");
        Ok(storage_id)
    }

    fn retrieve(&self, storage_id: &str, out: &mut dyn Write) -> Result<u64, StoreError> {
        let path = self.path_for(storage_id);
        let mut file = File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StoreError::MissingContent(storage_id.to_string())
            } else {
                e.into()
            }
        })?;
        Ok(io::copy(&mut file, out)?)
    }

    fn delete(&self, storage_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(storage_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> FileAttrs {
        FileAttrs {
            id: "n1".to_string(),
            name: "sample.txt".to_string(),
            content_type: "text".to_string(),
        }
    }

    #[test]
    fn test_store_retrieve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path().join("data")).unwrap();

        let id = store.store(&attrs(), &mut &b"payload"[..]).unwrap();
        let mut out = Vec::new();
        let n = store.retrieve(&id, &mut out).unwrap();
        assert_eq!(n, 7);
        assert_eq!(out, b"payload");

        store.delete(&id).unwrap();
        assert!(matches!(
            store.retrieve(&id, &mut Vec::new()),
            Err(StoreError::MissingContent(_))
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let id = store.store(&attrs(), &mut &b"x"[..]).unwrap();
        store.delete(&id).unwrap();
        store.delete(&id).unwrap();
        store.delete("never-existed").unwrap();
    }

    #[test]
    fn test_rapid_keys_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..64 {
            assert!(ids.insert(store.store(&attrs(), &mut &b"x"[..]).unwrap()));
        }
    }
}
