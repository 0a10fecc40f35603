//! Core identifier types for the content-store filesystem.

/// NodeId: globally unique identifier of a filesystem node.
pub type NodeId = String;

/// OwnerId: logical owner of a root and everything under it.
pub type OwnerId = String;

/// StoreId: configuration-scoped identifier of a content store.
pub type StoreId = String;

/// StorageId: opaque per-file key whose structure is private to the store
/// that issued it.
pub type StorageId = String;

/// ContentTypeId: identifier of a detected content type.
pub type ContentTypeId = String;

/// Lowercase hex MD5 of zero bytes; the checksum of a file with no content.
pub const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
