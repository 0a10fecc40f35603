//! Canopy: Hierarchical Content-Store Filesystem
//!
//! An owner-scoped tree of directory and file nodes where each file's byte
//! content is delegated to a pluggable content store, with MD5 content
//! fingerprinting, an LRU-fronted metadata layer, and bidirectional
//! synchronization with the local filesystem.

pub mod config;
pub mod content;
pub mod detect;
pub mod error;
pub mod fs;
pub mod logging;
pub mod meta;
pub mod stream;
pub mod types;
