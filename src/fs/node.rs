//! Filesystem node types.
//!
//! A node is an immutable snapshot; mutations go through the `Filesystem`
//! facade, which persists a fresh snapshot and republishes it to the cache.

use crate::error::FsError;
use crate::fs::media::MediaInfo;
use crate::types::{ContentTypeId, NodeId, OwnerId, StorageId, StoreId, EMPTY_MD5};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

/// Content-bearing fields of a file node.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Store holding this file's bytes.
    pub store: StoreId,
    /// Per-store storage key; `None` until content is first written.
    pub storage: Option<StorageId>,
    pub content_type: ContentTypeId,
    /// Lowercase hex MD5 of the content; the zero-byte digest by default.
    pub md5: String,
    /// Probed technical metadata, cached on the snapshot, never persisted.
    pub media: Option<MediaInfo>,
}

impl FileInfo {
    pub fn empty(default_type: impl Into<ContentTypeId>) -> Self {
        Self {
            store: StoreId::new(),
            storage: None,
            content_type: default_type.into(),
            md5: EMPTY_MD5.to_string(),
            media: None,
        }
    }
}

/// Child-id list load state. Fetched from the metadata manager on first
/// access and cached on the snapshot.
#[derive(Debug, Clone)]
pub enum ChildState {
    Unloaded,
    Loaded(Vec<NodeId>),
}

/// Aggregate bookkeeping of a directory node.
#[derive(Debug, Clone)]
pub struct DirInfo {
    pub children: ChildState,
    /// Direct subdirectory count.
    pub dirs_here: u64,
    /// Direct file count.
    pub files_here: u64,
    /// Recursive subdirectory count.
    pub dirs_total: u64,
    /// Recursive file count.
    pub files_total: u64,
}

impl DirInfo {
    /// A freshly created directory has a known-empty child list.
    pub fn empty() -> Self {
        Self {
            children: ChildState::Loaded(Vec::new()),
            dirs_here: 0,
            files_here: 0,
            dirs_total: 0,
            files_total: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    File(FileInfo),
    Directory(DirInfo),
}

/// An entry in the hierarchical namespace.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub owner: OwnerId,
    pub name: String,
    pub parent: Option<NodeId>,
    /// File: content length. Directory: sum of descendant file sizes.
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Set on the snapshot handed back from deletion; a deleted node is
    /// permanently unusable.
    pub deleted: bool,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn file(&self) -> Result<&FileInfo, FsError> {
        match &self.kind {
            NodeKind::File(info) => Ok(info),
            NodeKind::Directory(_) => Err(FsError::NotAFile(self.name.clone())),
        }
    }

    pub fn dir(&self) -> Result<&DirInfo, FsError> {
        match &self.kind {
            NodeKind::Directory(info) => Ok(info),
            NodeKind::File(_) => Err(FsError::NotADirectory(self.name.clone())),
        }
    }

    pub(crate) fn file_mut(&mut self) -> Result<&mut FileInfo, FsError> {
        match &mut self.kind {
            NodeKind::File(info) => Ok(info),
            NodeKind::Directory(_) => Err(FsError::NotAFile(self.name.clone())),
        }
    }

    pub(crate) fn dir_mut(&mut self) -> Result<&mut DirInfo, FsError> {
        match &mut self.kind {
            NodeKind::Directory(info) => Ok(info),
            NodeKind::File(_) => Err(FsError::NotADirectory(self.name.clone())),
        }
    }

    pub fn ensure_live(&self) -> Result<(), FsError> {
        if self.deleted {
            return Err(FsError::NodeDeleted(self.id.clone()));
        }
        Ok(())
    }
}

/// Validate and NFC-normalize a node name. Names must be non-empty, free of
/// path separators and NUL, and not a path alias.
pub fn valid_name(name: &str) -> Result<String, FsError> {
    let normalized: String = name.nfc().collect();
    if normalized.is_empty()
        || normalized == "."
        || normalized == ".."
        || normalized.contains(&['/', '\\', '\0'][..])
    {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(normalized)
}

/// Injectable sibling orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrder {
    /// Byte-wise name order.
    Name,
    /// Case-insensitive name order.
    NameFold,
    Size,
    Modified,
}

impl NodeOrder {
    pub fn compare(&self, a: &Node, b: &Node) -> Ordering {
        match self {
            NodeOrder::Name => a.name.cmp(&b.name),
            NodeOrder::NameFold => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
            NodeOrder::Size => a.size.cmp(&b.size).then_with(|| a.name.cmp(&b.name)),
            NodeOrder::Modified => a
                .modified
                .cmp(&b.modified)
                .then_with(|| a.name.cmp(&b.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, size: u64, modified_ms: i64) -> Node {
        Node {
            id: name.to_string(),
            owner: "o1".to_string(),
            name: name.to_string(),
            parent: None,
            size,
            modified: DateTime::<Utc>::from_timestamp_millis(modified_ms).unwrap(),
            deleted: false,
            kind: NodeKind::File(FileInfo::empty("binary")),
        }
    }

    #[test]
    fn test_valid_name_rejects_separators_and_aliases() {
        assert!(valid_name("a.txt").is_ok());
        assert!(valid_name("with space").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(valid_name(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_valid_name_normalizes_nfc() {
        // "e" + combining acute composes to a single scalar.
        let decomposed = "cafe\u{0301}";
        assert_eq!(valid_name(decomposed).unwrap(), "caf\u{00e9}");
    }

    #[test]
    fn test_orderings() {
        let a = node("Alpha", 10, 2000);
        let b = node("beta", 5, 1000);

        assert_eq!(NodeOrder::Name.compare(&a, &b), Ordering::Less); // 'A' < 'b'
        assert_eq!(NodeOrder::NameFold.compare(&a, &b), Ordering::Less);
        assert_eq!(NodeOrder::Size.compare(&a, &b), Ordering::Greater);
        assert_eq!(NodeOrder::Modified.compare(&a, &b), Ordering::Greater);

        let z = node("Zeta", 10, 2000);
        let a_lower = node("azure", 1, 1);
        // Case-sensitive puts 'Z' before 'a'; folded order does not.
        assert_eq!(NodeOrder::Name.compare(&z, &a_lower), Ordering::Less);
        assert_eq!(NodeOrder::NameFold.compare(&z, &a_lower), Ordering::Greater);
    }

    #[test]
    fn test_kind_accessors() {
        let file = node("f", 0, 0);
        assert!(file.is_file());
        assert!(file.file().is_ok());
        assert!(matches!(file.dir(), Err(FsError::NotADirectory(_))));

        let mut dir = node("d", 0, 0);
        dir.kind = NodeKind::Directory(DirInfo::empty());
        assert!(dir.is_directory());
        assert!(dir.dir().is_ok());
        assert!(matches!(dir.file(), Err(FsError::NotAFile(_))));
    }

    #[test]
    fn test_deleted_node_is_unusable() {
        let mut file = node("f", 0, 0);
        assert!(file.ensure_live().is_ok());
        file.deleted = true;
        assert!(matches!(file.ensure_live(), Err(FsError::NodeDeleted(_))));
    }
}
