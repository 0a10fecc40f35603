//! Content round-trip, integrity, and store-failure semantics.

mod common;

use canopy::content::{StorePolicy, StoreRegistry};
use canopy::detect::ContentTypeRegistry;
use canopy::error::FsError;
use canopy::fs::Filesystem;
use canopy::meta::{MemoryMetadataStore, MetaManager};
use canopy::types::EMPTY_MD5;
use common::{counting_store, memory_fs, CorruptibleStore, FailingStore};
use md5::{Digest, Md5};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_roundtrip_preserves_bytes_and_checksum() {
    let (fs, _) = memory_fs();
    let root = fs.create_root("root", "O1").unwrap();
    let file = fs.create_file(&root.id, "blob.bin").unwrap();

    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let written = fs.write_content(&file.id, payload.as_slice()).unwrap();
    assert_eq!(written.size, payload.len() as u64);

    let mut out = Vec::new();
    fs.read_content(&file.id, &mut out).unwrap();
    assert_eq!(out, payload);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// checksum(retrieve(store(x))) == checksum(x) for arbitrary bytes.
    #[test]
    fn prop_roundtrip_integrity(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let (fs, _) = memory_fs();
        let root = fs.create_root("root", "O1").unwrap();
        let file = fs.create_file(&root.id, "x.bin").unwrap();

        let written = fs.write_content(&file.id, payload.as_slice()).unwrap();
        let mut out = Vec::new();
        fs.read_content(&file.id, &mut out).unwrap();

        prop_assert_eq!(&out, &payload);
        prop_assert_eq!(written.size, payload.len() as u64);
        let expected = hex::encode(Md5::digest(&payload));
        prop_assert_eq!(&written.file().unwrap().md5, &expected);
    }
}

#[test]
fn test_tampered_content_fails_retrieval() {
    let store = Arc::new(CorruptibleStore::new());
    let mut stores = StoreRegistry::new();
    stores.register("mem", store.clone());
    let fs = Filesystem::new(
        MetaManager::new(Arc::new(MemoryMetadataStore::new()), 64),
        stores,
        StorePolicy::new("mem"),
        ContentTypeRegistry::builtin(),
    )
    .unwrap();

    let root = fs.create_root("root", "O1").unwrap();
    let file = fs.create_file(&root.id, "a.txt").unwrap();
    fs.write_content(&file.id, &b"trustworthy"[..]).unwrap();
    fs.read_content(&file.id, Vec::new()).unwrap();

    store.corrupt_retrievals();
    assert!(matches!(
        fs.read_content(&file.id, Vec::new()),
        Err(FsError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_store_failure_commits_no_metadata() {
    let mut stores = StoreRegistry::new();
    stores.register("broken", Arc::new(FailingStore));
    let fs = Filesystem::new(
        MetaManager::new(Arc::new(MemoryMetadataStore::new()), 64),
        stores,
        StorePolicy::new("broken"),
        ContentTypeRegistry::builtin(),
    )
    .unwrap();

    let root = fs.create_root("root", "O1").unwrap();
    let file = fs.create_file(&root.id, "a.txt").unwrap();
    assert!(matches!(
        fs.write_content(&file.id, &b"doomed"[..]),
        Err(FsError::Store(_))
    ));

    // Old checksum and size are retained.
    let after = fs.node(&file.id).unwrap().unwrap();
    assert_eq!(after.size, 0);
    assert_eq!(after.file().unwrap().md5, EMPTY_MD5);
    assert!(after.file().unwrap().storage.is_none());
    assert_eq!(fs.node(&root.id).unwrap().unwrap().size, 0);
}

#[test]
fn test_policy_routes_content_by_detected_type() {
    let text_store = counting_store();
    let media_store = counting_store();
    let mut stores = StoreRegistry::new();
    stores.register("text", text_store.clone());
    stores.register("media", media_store.clone());

    let fs = Filesystem::new(
        MetaManager::new(Arc::new(MemoryMetadataStore::new()), 64),
        stores,
        StorePolicy::new("text").route("mp4", "media"),
        ContentTypeRegistry::builtin(),
    )
    .unwrap();

    let root = fs.create_root("root", "O1").unwrap();
    let clip = fs.create_file(&root.id, "clip.mp4").unwrap();
    fs.write_content(&clip.id, &b"\x00\x00\x00\x18ftypmp42data"[..])
        .unwrap();
    let note = fs.create_file(&root.id, "note.txt").unwrap();
    fs.write_content(&note.id, &b"plain"[..]).unwrap();

    assert_eq!(media_store.writes(), 1);
    assert_eq!(text_store.writes(), 1);
    assert_eq!(
        fs.node(&clip.id).unwrap().unwrap().file().unwrap().store,
        "media"
    );
}

#[test]
fn test_unknown_store_is_rejected_at_assembly() {
    let stores = StoreRegistry::new();
    let result = Filesystem::new(
        MetaManager::new(Arc::new(MemoryMetadataStore::new()), 64),
        stores,
        StorePolicy::new("ghost"),
        ContentTypeRegistry::builtin(),
    );
    assert!(matches!(result, Err(FsError::UnknownStore(_))));
}
