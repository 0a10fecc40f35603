//! Filesystem node tree.
//!
//! `Filesystem` is the facade over the metadata manager, the content-store
//! registry, the store-selection policy, and the content-type registry. All
//! tree mutation goes through it: nodes are immutable snapshots, every
//! persisted change republishes a fresh snapshot, and directory aggregates
//! are walked up the parent chain as a sequence of independent persisted
//! writes.

pub mod access;
pub mod listing;
pub mod media;
pub mod node;
pub mod sync;

use crate::config::CanopyConfig;
use crate::content::{ContentStore, FileAttrs, StorePolicy, StoreRegistry};
use crate::detect::ContentTypeRegistry;
use crate::error::FsError;
use crate::fs::access::{AccessCheck, Operation, PermitAll};
use crate::fs::listing::ListingNode;
use crate::fs::media::{MediaInfo, MediaProbe};
use crate::fs::node::{valid_name, ChildState, DirInfo, FileInfo, Node, NodeKind, NodeOrder};
use crate::meta::{MetaManager, SledMetadataStore};
use crate::stream::{DigestReader, DigestWriter, HeaderSink, DEFAULT_HEADER_LIMIT};
use crate::types::{NodeId, StorageId};
use chrono::Utc;
use std::cmp::Ordering;
use std::io::{Read, Write};
use std::sync::Arc;

/// Aggregate adjustments applied along a parent chain. Direct counters touch
/// only the immediate parent; totals and size touch every ancestor.
#[derive(Debug, Default, Clone, Copy)]
struct TreeDelta {
    size: i64,
    files_here: i64,
    dirs_here: i64,
    files_total: i64,
    dirs_total: i64,
}

/// Loaded child-list adjustment on the immediate parent.
enum Attach {
    Add(NodeId),
    Remove(NodeId),
}

fn add_signed(value: u64, delta: i64) -> u64 {
    value.checked_add_signed(delta).unwrap_or(0)
}

pub struct Filesystem {
    meta: MetaManager,
    stores: StoreRegistry,
    policy: StorePolicy,
    types: ContentTypeRegistry,
    access: Arc<dyn AccessCheck>,
    probe: Option<Arc<dyn MediaProbe>>,
    header_limit: usize,
}

impl Filesystem {
    /// Assemble a filesystem, validating that every store id the policy
    /// references resolves in the registry.
    pub fn new(
        meta: MetaManager,
        stores: StoreRegistry,
        policy: StorePolicy,
        types: ContentTypeRegistry,
    ) -> Result<Self, FsError> {
        policy.validate(&stores)?;
        Ok(Self {
            meta,
            stores,
            policy,
            types,
            access: Arc::new(PermitAll),
            probe: None,
            header_limit: DEFAULT_HEADER_LIMIT,
        })
    }

    /// Build the whole stack from configuration.
    pub fn from_config(config: &CanopyConfig) -> Result<Self, FsError> {
        config.validate()?;
        let meta_store = SledMetadataStore::open(&config.metadata_path)?;
        let meta = MetaManager::new(Arc::new(meta_store), config.cache_capacity);
        let mut stores = StoreRegistry::new();
        for (id, def) in &config.stores {
            stores.register(id.clone(), def.build()?);
        }
        let mut policy = StorePolicy::new(config.default_store.clone());
        for (content_type, store) in &config.routes {
            policy = policy.route(content_type.clone(), store.clone());
        }
        let types = match &config.rules_path {
            Some(path) => ContentTypeRegistry::from_path(path)?,
            None => ContentTypeRegistry::builtin(),
        };
        Self::new(meta, stores, policy, types)
    }

    pub fn with_access(mut self, access: Arc<dyn AccessCheck>) -> Self {
        self.access = access;
        self
    }

    pub fn with_media_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_header_limit(mut self, header_limit: usize) -> Self {
        self.header_limit = header_limit;
        self
    }

    pub fn metadata(&self) -> &MetaManager {
        &self.meta
    }

    pub fn content_types(&self) -> &ContentTypeRegistry {
        &self.types
    }

    // ------------------------------------------------------------------
    // Construction and lookup
    // ------------------------------------------------------------------

    /// Create a root directory for an owner; persisted immediately.
    pub fn create_root(&self, name: &str, owner: &str) -> Result<Arc<Node>, FsError> {
        if owner.is_empty() {
            return Err(FsError::MissingParameter("owner"));
        }
        let name = valid_name(name)?;
        if self.meta.retrieve_root_node(owner)?.is_some() {
            return Err(FsError::RootExists(owner.to_string()));
        }
        let node = Node {
            id: self.meta.next_id(),
            owner: owner.to_string(),
            name,
            parent: None,
            size: 0,
            modified: Utc::now(),
            deleted: false,
            kind: NodeKind::Directory(DirInfo::empty()),
        };
        self.meta.store_node(node)
    }

    pub fn create_directory(&self, parent_id: &str, name: &str) -> Result<Arc<Node>, FsError> {
        self.create_node(parent_id, name, NodeKind::Directory(DirInfo::empty()))
    }

    pub fn create_file(&self, parent_id: &str, name: &str) -> Result<Arc<Node>, FsError> {
        let info = FileInfo::empty(self.types.default_type());
        self.create_node(parent_id, name, NodeKind::File(info))
    }

    fn create_node(
        &self,
        parent_id: &str,
        name: &str,
        kind: NodeKind,
    ) -> Result<Arc<Node>, FsError> {
        let name = valid_name(name)?;
        let parent = self.require(parent_id)?;
        self.access.check(&parent, Operation::Write)?;
        parent.dir()?;
        if self.meta.retrieve_child(parent_id, &name)?.is_some() {
            return Err(FsError::DuplicateName {
                parent: parent_id.to_string(),
                name,
            });
        }

        let is_dir = matches!(kind, NodeKind::Directory(_));
        let node = Node {
            id: self.meta.next_id(),
            owner: parent.owner.clone(),
            name,
            parent: Some(parent_id.to_string()),
            size: 0,
            modified: Utc::now(),
            deleted: false,
            kind,
        };
        let snapshot = self.meta.store_node(node)?;

        let delta = if is_dir {
            TreeDelta {
                dirs_here: 1,
                dirs_total: 1,
                ..TreeDelta::default()
            }
        } else {
            TreeDelta {
                files_here: 1,
                files_total: 1,
                ..TreeDelta::default()
            }
        };
        self.propagate(parent_id, Some(Attach::Add(snapshot.id.clone())), delta)?;
        Ok(snapshot)
    }

    /// Look a node up by id; deleted or unknown ids yield `None`.
    pub fn node(&self, id: &str) -> Result<Option<Arc<Node>>, FsError> {
        self.meta.retrieve_node(id)
    }

    /// The root directory of an owner's namespace.
    pub fn root(&self, owner: &str) -> Result<Option<Arc<Node>>, FsError> {
        self.meta.retrieve_root_node(owner)
    }

    fn require(&self, id: &str) -> Result<Arc<Node>, FsError> {
        let node = self
            .meta
            .retrieve_node(id)?
            .ok_or_else(|| FsError::NodeNotFound(id.to_string()))?;
        node.ensure_live()?;
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Children and paths
    // ------------------------------------------------------------------

    /// All direct children. Child ids are fetched lazily from the metadata
    /// manager on first access and cached on the snapshot.
    pub fn children(&self, dir_id: &str) -> Result<Vec<Arc<Node>>, FsError> {
        let node = self.require(dir_id)?;
        self.access.check(&node, Operation::Read)?;
        let ids = self.children_ids(&node)?;
        ids.iter().map(|id| self.require(id)).collect()
    }

    fn children_ids(&self, node: &Arc<Node>) -> Result<Vec<NodeId>, FsError> {
        match &node.dir()?.children {
            ChildState::Loaded(ids) => Ok(ids.clone()),
            ChildState::Unloaded => {
                let ids = self.meta.retrieve_children_ids(&node.id)?;
                let mut next = (**node).clone();
                next.dir_mut()?.children = ChildState::Loaded(ids.clone());
                self.meta.republish(next);
                Ok(ids)
            }
        }
    }

    pub fn children_sorted(
        &self,
        dir_id: &str,
        order: NodeOrder,
    ) -> Result<Vec<Arc<Node>>, FsError> {
        self.children_sorted_by(dir_id, |a, b| order.compare(a, b))
    }

    pub fn children_sorted_by<F>(&self, dir_id: &str, mut cmp: F) -> Result<Vec<Arc<Node>>, FsError>
    where
        F: FnMut(&Node, &Node) -> Ordering,
    {
        let mut children = self.children(dir_id)?;
        children.sort_by(|a, b| cmp(a, b));
        Ok(children)
    }

    /// Direct child by name.
    pub fn child(&self, dir_id: &str, name: &str) -> Result<Option<Arc<Node>>, FsError> {
        let node = self.require(dir_id)?;
        self.access.check(&node, Operation::Read)?;
        node.dir()?;
        self.meta.retrieve_child(dir_id, name)
    }

    /// Resolve a path from `start`. A leading separator resolves from the
    /// owning root; `.` and `..` are aliases. A missing segment yields
    /// `None`; descending through a file is an error.
    pub fn child_by_path(&self, start: &str, path: &str) -> Result<Option<Arc<Node>>, FsError> {
        let start = self.require(start)?;
        let mut current = if path.starts_with('/') {
            self.root_of(&start)?
        } else {
            start
        };
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match segment {
                "." => {}
                ".." => {
                    if let Some(parent) = &current.parent {
                        current = self.require(parent)?;
                    }
                }
                name => {
                    if !current.is_directory() {
                        return Err(FsError::NotADirectory(current.name.clone()));
                    }
                    match self.meta.retrieve_child(&current.id, name)? {
                        Some(child) => current = child,
                        None => return Ok(None),
                    }
                }
            }
        }
        Ok(Some(current))
    }

    fn root_of(&self, node: &Arc<Node>) -> Result<Arc<Node>, FsError> {
        let mut current = node.clone();
        while let Some(parent) = &current.parent {
            current = self.require(parent)?;
        }
        Ok(current)
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Replace a file's content from a raw stream.
    ///
    /// The stream is wrapped in a digesting reader, the header sniffed for
    /// type detection, the policy-selected store asked to persist the body,
    /// and only then is the node's metadata committed and the size delta
    /// walked up the parent chain. On store failure nothing is committed; a
    /// storage id orphaned by a failed commit is released best-effort.
    pub fn write_content<R: Read>(&self, file_id: &str, src: R) -> Result<Arc<Node>, FsError> {
        let node = self.require(file_id)?;
        self.access.check(&node, Operation::Write)?;
        node.file()?;

        let mut reader = DigestReader::with_header_limit(src, self.header_limit);
        reader.fill_header()?;
        let content_type = self.types.detect(&node.name, reader.header());
        let attrs = FileAttrs {
            id: node.id.clone(),
            name: node.name.clone(),
            content_type: content_type.clone(),
        };
        let store_id = self.policy.select(&attrs);
        let store = self.stores.get(&store_id)?;
        let storage_id = store.store(&attrs, &mut reader)?;

        let new_size = reader.len();
        let old_size = node.size;
        let previous = {
            let info = node.file()?;
            info.storage.clone().map(|storage| (info.store.clone(), storage))
        };

        let mut next = (*node).clone();
        {
            let info = next.file_mut()?;
            info.store = store_id;
            info.storage = Some(storage_id.clone());
            info.content_type = content_type;
            info.md5 = reader.md5_hex();
            info.media = None;
        }
        next.size = new_size;
        next.modified = Utc::now();

        let snapshot = match self.meta.store_node(next) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.release_content(&store, &storage_id);
                return Err(e);
            }
        };

        if let Some((old_store, old_storage)) = previous {
            if old_storage != storage_id {
                match self.stores.get(&old_store) {
                    Ok(old) => self.release_content(&old, &old_storage),
                    Err(_) => tracing::warn!(
                        store = %old_store,
                        storage = %old_storage,
                        "previous content store no longer configured"
                    ),
                }
            }
        }

        let delta = new_size as i64 - old_size as i64;
        if delta != 0 {
            if let Some(parent) = &snapshot.parent {
                self.propagate(
                    parent,
                    None,
                    TreeDelta {
                        size: delta,
                        ..TreeDelta::default()
                    },
                )?;
            }
        }
        Ok(snapshot)
    }

    fn release_content(&self, store: &Arc<dyn ContentStore>, storage_id: &StorageId) {
        if let Err(e) = store.delete(storage_id) {
            tracing::warn!(storage = %storage_id, error = %e, "failed to release content");
        }
    }

    /// Stream a file's content to `out`, re-verifying the recorded digest.
    /// A mismatch means the content is suspect and fails the retrieval.
    pub fn read_content<W: Write>(&self, file_id: &str, out: W) -> Result<u64, FsError> {
        let node = self.require(file_id)?;
        self.access.check(&node, Operation::Read)?;
        let info = node.file()?;
        let Some(storage) = &info.storage else {
            return Ok(0);
        };
        let store = self.stores.get(&info.store)?;
        let mut writer = DigestWriter::new(out);
        let n = store.retrieve(storage, &mut writer)?;
        let actual = writer.md5_hex();
        if actual != info.md5 {
            return Err(FsError::ChecksumMismatch {
                expected: info.md5.clone(),
                actual,
            });
        }
        Ok(n)
    }

    /// Probed audio/video technical metadata, lazily constructed and cached
    /// on the node. `None` without a registered probe or when the probe does
    /// not understand the content.
    pub fn media_info(&self, file_id: &str) -> Result<Option<MediaInfo>, FsError> {
        let node = self.require(file_id)?;
        self.access.check(&node, Operation::Read)?;
        let info = node.file()?;
        if let Some(media) = &info.media {
            return Ok(Some(media.clone()));
        }
        let Some(probe) = &self.probe else {
            return Ok(None);
        };

        let header = match &info.storage {
            Some(storage) => {
                let store = self.stores.get(&info.store)?;
                let mut sink = HeaderSink::new(self.header_limit);
                store.retrieve(storage, &mut sink)?;
                sink.bytes().to_vec()
            }
            None => Vec::new(),
        };
        let attrs = FileAttrs {
            id: node.id.clone(),
            name: node.name.clone(),
            content_type: info.content_type.clone(),
        };
        let media = probe.probe(&attrs, &header)?;
        if let Some(media) = &media {
            let mut next = (*node).clone();
            next.file_mut()?.media = Some(media.clone());
            self.meta.republish(next);
        }
        Ok(media)
    }

    /// Structured listing export of a subtree, children in name order.
    pub fn listing(&self, node_id: &str) -> Result<ListingNode, FsError> {
        let node = self.require(node_id)?;
        self.access.check(&node, Operation::Read)?;
        self.listing_inner(&node)
    }

    fn listing_inner(&self, node: &Arc<Node>) -> Result<ListingNode, FsError> {
        let children = if node.is_directory() {
            self.children_sorted(&node.id, NodeOrder::Name)?
                .iter()
                .map(|child| self.listing_inner(child))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        Ok(ListingNode::from_node(node, children))
    }

    // ------------------------------------------------------------------
    // Deletion and aggregates
    // ------------------------------------------------------------------

    /// Recursive depth-first deletion: children before the directory, each
    /// file's content released in its store, every record purged from cache
    /// and metadata store, aggregates walked back up the parent chain. A
    /// failure mid-recursion surfaces and leaves a partially deleted
    /// subtree.
    pub fn delete(&self, node_id: &str) -> Result<(), FsError> {
        let node = self.require(node_id)?;
        self.access.check(&node, Operation::Delete)?;
        self.delete_inner(&node)
    }

    fn delete_inner(&self, node: &Arc<Node>) -> Result<(), FsError> {
        match &node.kind {
            NodeKind::Directory(_) => {
                for child_id in self.meta.retrieve_children_ids(&node.id)? {
                    let child = self.require(&child_id)?;
                    self.delete_inner(&child)?;
                }
                self.meta.delete_node(&node.id)?;
                if let Some(parent) = &node.parent {
                    self.propagate(
                        parent,
                        Some(Attach::Remove(node.id.clone())),
                        TreeDelta {
                            dirs_here: -1,
                            dirs_total: -1,
                            ..TreeDelta::default()
                        },
                    )?;
                }
            }
            NodeKind::File(info) => {
                if let Some(storage) = &info.storage {
                    let store = self.stores.get(&info.store)?;
                    store.delete(storage)?;
                }
                self.meta.delete_node(&node.id)?;
                if let Some(parent) = &node.parent {
                    self.propagate(
                        parent,
                        Some(Attach::Remove(node.id.clone())),
                        TreeDelta {
                            size: -(node.size as i64),
                            files_here: -1,
                            files_total: -1,
                            ..TreeDelta::default()
                        },
                    )?;
                }
            }
        }
        tracing::debug!(node = %node.id, name = %node.name, "deleted node");
        Ok(())
    }

    /// Walk a structural delta up the ancestor chain, one persisted write
    /// per ancestor. Called exactly once per structural event; a failure
    /// mid-walk surfaces as a persistence error and leaves the remaining
    /// ancestors stale.
    fn propagate(
        &self,
        first_parent: &str,
        attach: Option<Attach>,
        delta: TreeDelta,
    ) -> Result<(), FsError> {
        let mut current = Some(first_parent.to_string());
        let mut direct = true;
        while let Some(id) = current {
            let node = self.require(&id)?;
            let mut next = (*node).clone();
            {
                let dir = next.dir_mut()?;
                if direct {
                    match &attach {
                        Some(Attach::Add(child)) => {
                            if let ChildState::Loaded(ids) = &mut dir.children {
                                ids.push(child.clone());
                            }
                        }
                        Some(Attach::Remove(child)) => {
                            if let ChildState::Loaded(ids) = &mut dir.children {
                                ids.retain(|c| c != child);
                            }
                        }
                        None => {}
                    }
                    dir.files_here = add_signed(dir.files_here, delta.files_here);
                    dir.dirs_here = add_signed(dir.dirs_here, delta.dirs_here);
                }
                dir.files_total = add_signed(dir.files_total, delta.files_total);
                dir.dirs_total = add_signed(dir.dirs_total, delta.dirs_total);
            }
            next.size = add_signed(next.size, delta.size);
            if direct {
                next.modified = Utc::now();
            }
            current = next.parent.clone();
            self.meta.store_node(next)?;
            direct = false;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::content::MemoryStore;
    use crate::meta::MemoryMetadataStore;

    /// Memory-backed filesystem plus a handle on its content store.
    pub fn memory_fs() -> (Filesystem, Arc<MemoryStore>) {
        let content = Arc::new(MemoryStore::new());
        let mut stores = StoreRegistry::new();
        stores.register("mem", content.clone());
        let fs = Filesystem::new(
            MetaManager::new(Arc::new(MemoryMetadataStore::new()), 64),
            stores,
            StorePolicy::new("mem"),
            ContentTypeRegistry::builtin(),
        )
        .unwrap();
        (fs, content)
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::memory_fs;
    use super::*;

    #[test]
    fn test_create_root_and_lookup() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        assert!(root.is_directory());
        assert_eq!(root.size, 0);

        let found = fs.root("O1").unwrap().unwrap();
        assert!(Arc::ptr_eq(&root, &found));
        assert!(fs.root("O2").unwrap().is_none());
    }

    #[test]
    fn test_one_root_per_owner() {
        let (fs, _) = memory_fs();
        fs.create_root("D1", "O1").unwrap();
        assert!(matches!(
            fs.create_root("D2", "O1"),
            Err(FsError::RootExists(_))
        ));
    }

    #[test]
    fn test_sibling_names_are_unique() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        fs.create_file(&root.id, "a.txt").unwrap();
        assert!(matches!(
            fs.create_file(&root.id, "a.txt"),
            Err(FsError::DuplicateName { .. })
        ));
        assert!(matches!(
            fs.create_directory(&root.id, "a.txt"),
            Err(FsError::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_children_under_file_rejected() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let file = fs.create_file(&root.id, "a.txt").unwrap();
        assert!(matches!(
            fs.create_file(&file.id, "b.txt"),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(
            fs.children(&file.id),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let file = fs.create_file(&root.id, "a.txt").unwrap();
        assert_eq!(file.file().unwrap().md5, crate::types::EMPTY_MD5);

        let updated = fs.write_content(&file.id, &b"hello"[..]).unwrap();
        assert_eq!(updated.size, 5);
        assert_eq!(
            updated.file().unwrap().md5,
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(updated.file().unwrap().content_type, "text");

        let mut out = Vec::new();
        let n = fs.read_content(&file.id, &mut out).unwrap();
        assert_eq!(n, 5);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_read_before_first_write_is_empty() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let file = fs.create_file(&root.id, "a.txt").unwrap();
        let mut out = Vec::new();
        assert_eq!(fs.read_content(&file.id, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_rewrite_releases_previous_content() {
        let (fs, content) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let file = fs.create_file(&root.id, "a.txt").unwrap();
        fs.write_content(&file.id, &b"first"[..]).unwrap();
        fs.write_content(&file.id, &b"second"[..]).unwrap();
        assert_eq!(content.object_count(), 1);

        let mut out = Vec::new();
        fs.read_content(&file.id, &mut out).unwrap();
        assert_eq!(out, b"second");
    }

    #[test]
    fn test_child_by_path_resolution() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let sub = fs.create_directory(&root.id, "sub").unwrap();
        let file = fs.create_file(&sub.id, "a.txt").unwrap();

        let hit = fs.child_by_path(&root.id, "sub/a.txt").unwrap().unwrap();
        assert!(Arc::ptr_eq(&hit, &fs.node(&file.id).unwrap().unwrap()));

        // Absolute paths resolve from the owning root, from any start.
        let abs = fs.child_by_path(&file.id, "/sub/a.txt").unwrap().unwrap();
        assert_eq!(abs.id, file.id);

        // Aliases.
        let via_alias = fs
            .child_by_path(&sub.id, "./../sub/a.txt")
            .unwrap()
            .unwrap();
        assert_eq!(via_alias.id, file.id);

        // Missing segment.
        assert!(fs.child_by_path(&root.id, "sub/missing").unwrap().is_none());
        // Descending through a file.
        assert!(matches!(
            fs.child_by_path(&root.id, "sub/a.txt/deeper"),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_sorted_children() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        fs.create_file(&root.id, "beta").unwrap();
        fs.create_file(&root.id, "Alpha").unwrap();
        let gamma = fs.create_file(&root.id, "gamma").unwrap();
        fs.write_content(&gamma.id, &b"large content"[..]).unwrap();

        let names: Vec<String> = fs
            .children_sorted(&root.id, NodeOrder::NameFold)
            .unwrap()
            .iter()
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);

        let by_size = fs.children_sorted(&root.id, NodeOrder::Size).unwrap();
        assert_eq!(by_size.last().unwrap().name, "gamma");

        let custom = fs
            .children_sorted_by(&root.id, |a, b| b.name.cmp(&a.name))
            .unwrap();
        assert_eq!(custom.first().unwrap().name, "gamma");
    }

    #[test]
    fn test_media_probe_result_is_cached_on_the_node() {
        struct StubProbe;
        impl MediaProbe for StubProbe {
            fn probe(
                &self,
                _file: &FileAttrs,
                header: &[u8],
            ) -> Result<Option<MediaInfo>, FsError> {
                Ok(Some(MediaInfo {
                    duration_secs: header.len() as f64,
                    bit_rate: Some(128_000),
                    frame_rate: None,
                    player_url: None,
                }))
            }
        }

        let (fs, _) = memory_fs();
        let fs = fs.with_media_probe(Arc::new(StubProbe));
        let root = fs.create_root("D1", "O1").unwrap();
        let clip = fs.create_file(&root.id, "clip.mp4").unwrap();
        fs.write_content(&clip.id, &b"hello"[..]).unwrap();

        let info = fs.media_info(&clip.id).unwrap().unwrap();
        assert_eq!(info.duration_secs, 5.0);

        let snapshot = fs.node(&clip.id).unwrap().unwrap();
        assert_eq!(snapshot.file().unwrap().media.as_ref(), Some(&info));
    }

    #[test]
    fn test_listing_export_shape() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let sub = fs.create_directory(&root.id, "sub").unwrap();
        let file = fs.create_file(&sub.id, "a.txt").unwrap();
        fs.write_content(&file.id, &b"hello"[..]).unwrap();

        let listing = fs.listing(&root.id).unwrap();
        assert_eq!(listing.name, "D1");
        assert_eq!(listing.size, 5);
        assert!(listing.checksum.is_none());
        assert_eq!(listing.children.len(), 1);

        let entry = &listing.children[0].children[0];
        assert_eq!(entry.name, "a.txt");
        assert_eq!(
            entry.checksum.as_deref(),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
        assert_eq!(entry.content_type.as_deref(), Some("text"));

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["children"][0]["children"][0]["name"], "a.txt");
    }

    #[test]
    fn test_deleted_node_operations_fail() {
        let (fs, _) = memory_fs();
        let root = fs.create_root("D1", "O1").unwrap();
        let file = fs.create_file(&root.id, "a.txt").unwrap();
        fs.delete(&file.id).unwrap();

        assert!(matches!(
            fs.write_content(&file.id, &b"x"[..]),
            Err(FsError::NodeNotFound(_))
        ));
        assert!(matches!(
            fs.delete(&file.id),
            Err(FsError::NodeNotFound(_))
        ));
        assert!(fs.child(&root.id, "a.txt").unwrap().is_none());
    }
}
