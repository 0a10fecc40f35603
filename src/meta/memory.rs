//! In-memory metadata store for tests and ephemeral deployments.

use super::{MetadataStore, NodeRecord};
use crate::error::StoreError;
use crate::types::NodeId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Inner {
    nodes: HashMap<NodeId, NodeRecord>,
    /// (parent, name) -> child id, ordered for stable enumeration.
    children: BTreeMap<(NodeId, String), NodeId>,
    roots: HashMap<String, NodeId>,
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<Inner>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().nodes.len()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn store_node(&self, record: &NodeRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.nodes.get(&record.id) {
            if previous.parent != record.parent || previous.name != record.name {
                if let Some(parent) = previous.parent.clone() {
                    let name = previous.name.clone();
                    inner.children.remove(&(parent, name));
                }
            }
        }
        if let Some(parent) = &record.parent {
            inner
                .children
                .insert((parent.clone(), record.name.clone()), record.id.clone());
        } else if record.is_directory() {
            inner.roots.insert(record.owner.clone(), record.id.clone());
        }
        inner.nodes.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn retrieve_node(&self, id: &str) -> Result<Option<NodeRecord>, StoreError> {
        Ok(self.inner.read().nodes.get(id).cloned())
    }

    fn retrieve_root_node(&self, owner: &str) -> Result<Option<NodeRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .roots
            .get(owner)
            .and_then(|id| inner.nodes.get(id))
            .cloned())
    }

    fn retrieve_child(&self, parent: &str, name: &str) -> Result<Option<NodeRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .children
            .get(&(parent.to_string(), name.to_string()))
            .and_then(|id| inner.nodes.get(id))
            .cloned())
    }

    fn retrieve_children_ids(&self, parent: &str) -> Result<Vec<NodeId>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .children
            .range((parent.to_string(), String::new())..)
            .take_while(|((p, _), _)| p == parent)
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn delete_node(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let Some(record) = inner.nodes.remove(id) else {
            return Ok(());
        };
        if let Some(parent) = record.parent {
            inner.children.remove(&(parent, record.name));
        } else if record.is_directory() {
            inner.roots.remove(&record.owner);
        }
        Ok(())
    }
}
