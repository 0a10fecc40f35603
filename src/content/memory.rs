//! In-process content store.
//!
//! Backs tests and stands in for streaming-media backends in deployments
//! that do not need durable content.

use super::{ContentStore, FileAttrs};
use crate::error::StoreError;
use crate::types::StorageId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<StorageId, Vec<u8>>>,
    next: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects. Lets tests assert that deletion leaves no
    /// orphaned storage ids behind.
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    pub fn contains(&self, storage_id: &str) -> bool {
        self.objects.read().contains_key(storage_id)
    }
}

impl ContentStore for MemoryStore {
    fn store(&self, _file: &FileAttrs, src: &mut dyn Read) -> Result<StorageId, StoreError> {
        let mut bytes = Vec::new();
        src.read_to_end(&mut bytes)?;
        let storage_id = format!("mem-{}", self.next.fetch_add(1, Ordering::Relaxed));
        self.objects.write().insert(storage_id.clone(), bytes);
        Ok(storage_id)
    }

    fn retrieve(&self, storage_id: &str, out: &mut dyn Write) -> Result<u64, StoreError> {
        let objects = self.objects.read();
        let bytes = objects
            .get(storage_id)
            .ok_or_else(|| StoreError::MissingContent(storage_id.to_string()))?;
        out.write_all(bytes)?;
        Ok(bytes.len() as u64)
    }

    fn delete(&self, storage_id: &str) -> Result<(), StoreError> {
        self.objects.write().remove(storage_id);
        Ok(())
    }
}
