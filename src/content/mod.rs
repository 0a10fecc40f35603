//! Content store abstraction.
//!
//! A content store persists, retrieves, and deletes the byte content of a
//! single file, identified by an opaque per-store storage id. Multiple
//! interchangeable implementations coexist in one deployment; a policy
//! selects the store per file, so the node tree is insulated from backend
//! specifics.

pub mod disk;
pub mod memory;
pub mod remote;

use crate::error::{FsError, StoreError};
use crate::types::{ContentTypeId, NodeId, StorageId, StoreId};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// File attributes a store or selection policy may inspect.
#[derive(Debug, Clone)]
pub struct FileAttrs {
    pub id: NodeId,
    pub name: String,
    pub content_type: ContentTypeId,
}

/// Pluggable backend persisting a single file's byte content.
///
/// `retrieve` must reproduce exactly the bytes previously stored under the
/// returned storage id. `delete` is idempotent; absent content is not an
/// error. All operations are potentially blocking I/O.
pub trait ContentStore: Send + Sync {
    /// Store all bytes from `src`, returning the storage id the file node
    /// must remember.
    fn store(&self, file: &FileAttrs, src: &mut dyn Read) -> Result<StorageId, StoreError>;

    /// Stream the stored bytes to `out`, returning the byte count.
    fn retrieve(&self, storage_id: &str, out: &mut dyn Write) -> Result<u64, StoreError>;

    /// Remove the stored bytes. Removing absent content succeeds.
    fn delete(&self, storage_id: &str) -> Result<(), StoreError>;
}

/// Explicit, constructed store registry.
///
/// Built once from configuration and passed to callers; every referenced
/// store id is resolvable or lookup fails with a configuration error.
#[derive(Default)]
pub struct StoreRegistry {
    stores: HashMap<StoreId, Arc<dyn ContentStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<StoreId>, store: Arc<dyn ContentStore>) {
        self.stores.insert(id.into(), store);
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ContentStore>, FsError> {
        self.stores
            .get(id)
            .cloned()
            .ok_or_else(|| FsError::UnknownStore(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stores.contains_key(id)
    }

    pub fn ids(&self) -> Vec<StoreId> {
        let mut ids: Vec<StoreId> = self.stores.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Store-selection policy: an injectable content-type to store-id table plus
/// a default.
#[derive(Debug, Clone)]
pub struct StorePolicy {
    routes: HashMap<ContentTypeId, StoreId>,
    default: StoreId,
}

impl StorePolicy {
    pub fn new(default: impl Into<StoreId>) -> Self {
        Self {
            routes: HashMap::new(),
            default: default.into(),
        }
    }

    pub fn route(mut self, content_type: impl Into<ContentTypeId>, store: impl Into<StoreId>) -> Self {
        self.routes.insert(content_type.into(), store.into());
        self
    }

    /// Pick the store for a file, chiefly from its detected content type.
    pub fn select(&self, file: &FileAttrs) -> StoreId {
        self.routes
            .get(&file.content_type)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// Startup-time validation that every referenced store id resolves.
    pub fn validate(&self, registry: &StoreRegistry) -> Result<(), FsError> {
        if !registry.contains(&self.default) {
            return Err(FsError::UnknownStore(self.default.clone()));
        }
        for store in self.routes.values() {
            if !registry.contains(store) {
                return Err(FsError::UnknownStore(store.clone()));
            }
        }
        Ok(())
    }
}
