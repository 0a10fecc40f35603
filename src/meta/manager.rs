//! Cache-fronted metadata manager.
//!
//! Brokers node persistence and lookup over a pluggable `MetadataStore`,
//! with a bounded LRU cache keyed by node id. Every write path updates the
//! store and then republishes a fresh immutable snapshot; every delete
//! purges both; reads consult the cache first and repopulate on miss.
//! Reconstruction returns the resident snapshot when one exists, preserving
//! node identity. Store I/O is never performed while the cache lock is held.

use super::{MetadataStore, NodeRecord};
use crate::error::FsError;
use crate::fs::node::Node;
use crate::meta::idgen::IdGenerator;
use crate::types::NodeId;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

pub struct MetaManager {
    store: Arc<dyn MetadataStore>,
    cache: Mutex<LruCache<NodeId, Arc<Node>>>,
    ids: IdGenerator,
}

impl MetaManager {
    pub fn new(store: Arc<dyn MetadataStore>, cache_capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(cache_capacity.max(1)).expect("capacity is at least one");
        Self {
            store,
            cache: Mutex::new(LruCache::new(capacity)),
            ids: IdGenerator::new(),
        }
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ids = IdGenerator::with_prefix(prefix);
        self
    }

    /// Allocate a globally unique node id.
    pub fn next_id(&self) -> NodeId {
        self.ids.next()
    }

    /// Persist a node and republish its snapshot.
    pub fn store_node(&self, node: Node) -> Result<Arc<Node>, FsError> {
        let record = NodeRecord::from_node(&node);
        self.store.store_node(&record)?;
        let snapshot = Arc::new(node);
        self.cache
            .lock()
            .put(snapshot.id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// Replace the cached snapshot without touching the persistent store.
    /// For fields derived at runtime (loaded child lists, probed media
    /// info) whose persisted form is unchanged.
    pub fn republish(&self, node: Node) -> Arc<Node> {
        let snapshot = Arc::new(node);
        self.cache
            .lock()
            .put(snapshot.id.clone(), snapshot.clone());
        snapshot
    }

    pub fn retrieve_node(&self, id: &str) -> Result<Option<Arc<Node>>, FsError> {
        if let Some(node) = self.cache.lock().get(id) {
            return Ok(Some(node.clone()));
        }
        match self.store.retrieve_node(id)? {
            Some(record) => Ok(Some(self.admit(record))),
            None => Ok(None),
        }
    }

    pub fn retrieve_root_node(&self, owner: &str) -> Result<Option<Arc<Node>>, FsError> {
        match self.store.retrieve_root_node(owner)? {
            Some(record) => Ok(Some(self.admit(record))),
            None => Ok(None),
        }
    }

    pub fn retrieve_child(&self, parent: &str, name: &str) -> Result<Option<Arc<Node>>, FsError> {
        match self.store.retrieve_child(parent, name)? {
            Some(record) => Ok(Some(self.admit(record))),
            None => Ok(None),
        }
    }

    pub fn retrieve_children_ids(&self, parent: &str) -> Result<Vec<NodeId>, FsError> {
        Ok(self.store.retrieve_children_ids(parent)?)
    }

    /// Purge a node from cache and store.
    pub fn delete_node(&self, id: &str) -> Result<(), FsError> {
        self.store.delete_node(id)?;
        self.cache.lock().pop(id);
        Ok(())
    }

    /// Cache a reconstructed record, returning the resident snapshot if a
    /// concurrent reader beat us to it.
    fn admit(&self, record: NodeRecord) -> Arc<Node> {
        let node = record.into_node();
        let mut cache = self.cache.lock();
        if let Some(existing) = cache.get(&node.id) {
            return existing.clone();
        }
        let snapshot = Arc::new(node);
        cache.put(snapshot.id.clone(), snapshot.clone());
        snapshot
    }
}
