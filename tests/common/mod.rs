//! Shared fixtures for integration tests.
#![allow(dead_code)]

use canopy::content::{ContentStore, FileAttrs, MemoryStore, StorePolicy, StoreRegistry};
use canopy::detect::ContentTypeRegistry;
use canopy::error::StoreError;
use canopy::fs::Filesystem;
use canopy::meta::{MemoryMetadataStore, MetaManager};
use canopy::types::StorageId;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Memory-backed filesystem plus a handle on its content store.
pub fn memory_fs() -> (Filesystem, Arc<MemoryStore>) {
    let content = Arc::new(MemoryStore::new());
    let mut stores = StoreRegistry::new();
    stores.register("mem", content.clone());
    let fs = Filesystem::new(
        MetaManager::new(Arc::new(MemoryMetadataStore::new()), 64),
        stores,
        StorePolicy::new("mem"),
        ContentTypeRegistry::builtin(),
    )
    .unwrap();
    (fs, content)
}

/// Fresh memory-backed counting store.
pub fn counting_store() -> Arc<CountingStore> {
    Arc::new(CountingStore::new(Arc::new(MemoryStore::new())))
}

/// Store wrapper counting write operations; backs the checksum
/// short-circuit assertions.
pub struct CountingStore {
    inner: Arc<MemoryStore>,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ContentStore for CountingStore {
    fn store(&self, file: &FileAttrs, src: &mut dyn Read) -> Result<StorageId, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.store(file, src)
    }

    fn retrieve(&self, storage_id: &str, out: &mut dyn Write) -> Result<u64, StoreError> {
        self.inner.retrieve(storage_id, out)
    }

    fn delete(&self, storage_id: &str) -> Result<(), StoreError> {
        self.inner.delete(storage_id)
    }
}

/// Store whose retrievals can be flipped to return tampered bytes.
pub struct CorruptibleStore {
    inner: MemoryStore,
    corrupt: AtomicBool,
}

impl CorruptibleStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            corrupt: AtomicBool::new(false),
        }
    }

    pub fn corrupt_retrievals(&self) {
        self.corrupt.store(true, Ordering::SeqCst);
    }
}

impl ContentStore for CorruptibleStore {
    fn store(&self, file: &FileAttrs, src: &mut dyn Read) -> Result<StorageId, StoreError> {
        self.inner.store(file, src)
    }

    fn retrieve(&self, storage_id: &str, out: &mut dyn Write) -> Result<u64, StoreError> {
        if !self.corrupt.load(Ordering::SeqCst) {
            return self.inner.retrieve(storage_id, out);
        }
        let mut bytes = Vec::new();
        self.inner.retrieve(storage_id, &mut bytes)?;
        for byte in &mut bytes {
            *byte ^= 0xff;
        }
        out.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    fn delete(&self, storage_id: &str) -> Result<(), StoreError> {
        self.inner.delete(storage_id)
    }
}

/// Store that rejects every write.
pub struct FailingStore;

impl ContentStore for FailingStore {
    fn store(&self, _file: &FileAttrs, _src: &mut dyn Read) -> Result<StorageId, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "backend unavailable",
        )))
    }

    fn retrieve(&self, storage_id: &str, _out: &mut dyn Write) -> Result<u64, StoreError> {
        Err(StoreError::MissingContent(storage_id.to_string()))
    }

    fn delete(&self, _storage_id: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
