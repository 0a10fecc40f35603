//! Sled-backed metadata store.
//!
//! Three trees: `nodes` (id -> bincode record), `children` (a
//! "parent/name" index for sibling lookup and child enumeration), and
//! `roots` (owner -> root node id).

use super::{MetadataStore, NodeRecord};
use crate::error::StoreError;
use crate::types::NodeId;
use std::path::Path;

pub struct SledMetadataStore {
    _db: sled::Db,
    nodes: sled::Tree,
    children: sled::Tree,
    roots: sled::Tree,
}

/// Generated ids and validated names never contain '/', so it is a safe
/// index-key separator.
fn child_key(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

impl SledMetadataStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            nodes: db.open_tree("nodes")?,
            children: db.open_tree("children")?,
            roots: db.open_tree("roots")?,
            _db: db,
        })
    }

    fn decode(bytes: &[u8]) -> Result<NodeRecord, StoreError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl MetadataStore for SledMetadataStore {
    fn store_node(&self, record: &NodeRecord) -> Result<(), StoreError> {
        // A re-persisted node keeps its (parent, name); drop the old index
        // entry if either ever changes.
        if let Some(previous) = self.nodes.get(record.id.as_bytes())? {
            let previous = Self::decode(&previous)?;
            if previous.parent != record.parent || previous.name != record.name {
                if let Some(parent) = &previous.parent {
                    self.children
                        .remove(child_key(parent, &previous.name).as_bytes())?;
                }
            }
        }

        self.nodes
            .insert(record.id.as_bytes(), bincode::serialize(record)?)?;
        if let Some(parent) = &record.parent {
            self.children
                .insert(child_key(parent, &record.name).as_bytes(), record.id.as_bytes())?;
        } else if record.is_directory() {
            self.roots
                .insert(record.owner.as_bytes(), record.id.as_bytes())?;
        }
        Ok(())
    }

    fn retrieve_node(&self, id: &str) -> Result<Option<NodeRecord>, StoreError> {
        match self.nodes.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn retrieve_root_node(&self, owner: &str) -> Result<Option<NodeRecord>, StoreError> {
        match self.roots.get(owner.as_bytes())? {
            Some(id) => self.retrieve_node(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    fn retrieve_child(&self, parent: &str, name: &str) -> Result<Option<NodeRecord>, StoreError> {
        match self.children.get(child_key(parent, name).as_bytes())? {
            Some(id) => self.retrieve_node(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    fn retrieve_children_ids(&self, parent: &str) -> Result<Vec<NodeId>, StoreError> {
        let prefix = format!("{}/", parent);
        let mut ids = Vec::new();
        for entry in self.children.scan_prefix(prefix.as_bytes()) {
            let (_, id) = entry?;
            ids.push(String::from_utf8_lossy(&id).to_string());
        }
        Ok(ids)
    }

    fn delete_node(&self, id: &str) -> Result<(), StoreError> {
        let Some(bytes) = self.nodes.get(id.as_bytes())? else {
            return Ok(());
        };
        let record = Self::decode(&bytes)?;
        if let Some(parent) = &record.parent {
            self.children
                .remove(child_key(parent, &record.name).as_bytes())?;
        } else if record.is_directory() {
            self.roots.remove(record.owner.as_bytes())?;
        }
        self.nodes.remove(id.as_bytes())?;
        Ok(())
    }
}
