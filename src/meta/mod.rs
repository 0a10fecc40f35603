//! Node metadata persistence.
//!
//! `NodeRecord` is the raw persisted field set for a node; `MetadataStore`
//! is the six-operation contract a durable metadata backend implements.
//! `MetaManager` fronts a backend with a bounded LRU cache and owns node id
//! allocation.

pub mod idgen;
pub mod manager;
pub mod memory;
pub mod sled;

use crate::fs::node::{ChildState, DirInfo, FileInfo, Node, NodeKind};
use crate::types::{ContentTypeId, NodeId, OwnerId, StorageId, StoreId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use manager::MetaManager;
pub use memory::MemoryMetadataStore;
pub use self::sled::SledMetadataStore;

/// Type discriminator plus kind-specific persisted fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecordKind {
    File {
        store: StoreId,
        storage: Option<StorageId>,
        content_type: ContentTypeId,
        md5: String,
    },
    Directory {
        dirs_here: u64,
        files_here: u64,
        dirs_total: u64,
        files_total: u64,
    },
}

/// Raw persisted fields of a node. The child-id list is not stored on the
/// parent; it is derived from the (parent, name) index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub owner: OwnerId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub size: u64,
    pub modified_ms: i64,
    pub kind: RecordKind,
}

impl NodeRecord {
    pub fn from_node(node: &Node) -> Self {
        let kind = match &node.kind {
            NodeKind::File(f) => RecordKind::File {
                store: f.store.clone(),
                storage: f.storage.clone(),
                content_type: f.content_type.clone(),
                md5: f.md5.clone(),
            },
            NodeKind::Directory(d) => RecordKind::Directory {
                dirs_here: d.dirs_here,
                files_here: d.files_here,
                dirs_total: d.dirs_total,
                files_total: d.files_total,
            },
        };
        Self {
            id: node.id.clone(),
            owner: node.owner.clone(),
            name: node.name.clone(),
            parent: node.parent.clone(),
            size: node.size,
            modified_ms: node.modified.timestamp_millis(),
            kind,
        }
    }

    /// Reconstruct an in-memory node. Directory child lists start unloaded;
    /// they are fetched through the manager on first access.
    pub fn into_node(self) -> Node {
        let kind = match self.kind {
            RecordKind::File {
                store,
                storage,
                content_type,
                md5,
            } => NodeKind::File(FileInfo {
                store,
                storage,
                content_type,
                md5,
                media: None,
            }),
            RecordKind::Directory {
                dirs_here,
                files_here,
                dirs_total,
                files_total,
            } => NodeKind::Directory(DirInfo {
                children: ChildState::Unloaded,
                dirs_here,
                files_here,
                dirs_total,
                files_total,
            }),
        };
        Node {
            id: self.id,
            owner: self.owner,
            name: self.name,
            parent: self.parent,
            size: self.size,
            modified: DateTime::<Utc>::from_timestamp_millis(self.modified_ms)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            deleted: false,
            kind,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, RecordKind::Directory { .. })
    }
}

/// Durable metadata backend contract.
pub trait MetadataStore: Send + Sync {
    fn store_node(&self, record: &NodeRecord) -> Result<(), crate::error::StoreError>;

    fn retrieve_node(&self, id: &str) -> Result<Option<NodeRecord>, crate::error::StoreError>;

    fn retrieve_root_node(&self, owner: &str)
        -> Result<Option<NodeRecord>, crate::error::StoreError>;

    fn retrieve_child(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<Option<NodeRecord>, crate::error::StoreError>;

    fn retrieve_children_ids(&self, parent: &str) -> Result<Vec<NodeId>, crate::error::StoreError>;

    fn delete_node(&self, id: &str) -> Result<(), crate::error::StoreError>;
}
