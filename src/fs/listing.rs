//! Structured directory-listing export.
//!
//! A tree-shaped, serializable view of a subtree for presentation layers
//! outside this core: per node id, name, size, last-modified; for files the
//! content type, checksum, and any probed media info.

use crate::fs::media::MediaInfo;
use crate::fs::node::{Node, NodeKind};
use crate::types::{ContentTypeId, NodeId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ListingNode {
    pub id: NodeId,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentTypeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ListingNode>,
}

impl ListingNode {
    pub fn from_node(node: &Node, children: Vec<ListingNode>) -> Self {
        let (content_type, checksum, media) = match &node.kind {
            NodeKind::File(f) => (
                Some(f.content_type.clone()),
                Some(f.md5.clone()),
                f.media.clone(),
            ),
            NodeKind::Directory(_) => (None, None, None),
        };
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            size: node.size,
            modified: node.modified,
            content_type,
            checksum,
            media,
            children,
        }
    }
}
