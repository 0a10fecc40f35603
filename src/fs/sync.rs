//! Import/export synchronization with the local filesystem.
//!
//! Import mirrors a local file or directory subtree into the node tree,
//! using content checksums to skip unchanged files. The sync is additive:
//! target nodes with no local counterpart are left untouched, unless a name
//! collides with the wrong node type, in which case type takes precedence
//! and the colliding node is deleted. Export is the mirror operation onto
//! the local disk.

use super::Filesystem;
use crate::error::FsError;
use crate::fs::node::{Node, NodeKind};
use crate::stream::DigestReader;
use crate::types::NodeId;
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

impl Filesystem {
    /// Recursively mirror a local file or directory into `target_dir`.
    pub fn import_files(&self, local: &Path, target_dir: &str) -> Result<(), FsError> {
        let local = dunce::canonicalize(local)?;
        let target = self
            .node(target_dir)?
            .ok_or_else(|| FsError::NodeNotFound(target_dir.to_string()))?;
        target.dir()?;

        let meta = std::fs::metadata(&local)?;
        if meta.is_file() {
            return self.import_file(&local, &target.id);
        }

        // Walk depth-first in name order so every entry's parent directory
        // node exists (or was just created) before the entry itself.
        let mut dirs: HashMap<PathBuf, NodeId> = HashMap::new();
        dirs.insert(PathBuf::new(), target.id.clone());
        for entry in WalkDir::new(&local)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                FsError::Io(e.into_io_error().unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::Other, "walk loop")
                }))
            })?;
            let rel = entry
                .path()
                .strip_prefix(&local)
                .expect("walk entries live under the walk root")
                .to_path_buf();
            let parent_rel = rel.parent().map(Path::to_path_buf).unwrap_or_default();
            let parent_id = dirs
                .get(&parent_rel)
                .expect("parent visited before child")
                .clone();

            if entry.file_type().is_dir() {
                let node = self.ensure_directory(&parent_id, &name_of(&rel)?)?;
                dirs.insert(rel, node.id.clone());
            } else if entry.file_type().is_file() {
                self.import_file(entry.path(), &parent_id)?;
            }
            // Symlinks and special files are skipped.
        }
        Ok(())
    }

    /// Import a single local file under `parent_id`, skipping the store
    /// write when the recorded checksum already matches.
    fn import_file(&self, local: &Path, parent_id: &str) -> Result<(), FsError> {
        let name = name_of(local)?;
        let node = match self.child(parent_id, &name)? {
            Some(existing) if existing.is_directory() => {
                // A local file shadows a directory node: type precedence.
                self.delete(&existing.id)?;
                self.create_file(parent_id, &name)?
            }
            Some(existing) => {
                let local_md5 = file_md5(local)?;
                if existing.file()?.md5 == local_md5 {
                    tracing::debug!(name = %name, "content unchanged, skipping store write");
                    return Ok(());
                }
                existing
            }
            None => self.create_file(parent_id, &name)?,
        };
        self.write_content(&node.id, File::open(local)?)?;
        Ok(())
    }

    fn ensure_directory(&self, parent_id: &str, name: &str) -> Result<Arc<Node>, FsError> {
        match self.child(parent_id, name)? {
            Some(existing) if existing.is_directory() => Ok(existing),
            Some(existing) => {
                // A local directory shadows a file node: type precedence.
                self.delete(&existing.id)?;
                self.create_directory(parent_id, name)
            }
            None => self.create_directory(parent_id, name),
        }
    }

    /// Write every descendant of `source` to the local filesystem, creating
    /// subdirectories as needed. Pre-existing local content not present in
    /// the source tree is left untouched.
    pub fn export_files(&self, source: &str, local: &Path) -> Result<(), FsError> {
        let node = self
            .node(source)?
            .ok_or_else(|| FsError::NodeNotFound(source.to_string()))?;
        match &node.kind {
            NodeKind::File(_) => {
                let target = if local.is_dir() {
                    local.join(&node.name)
                } else {
                    local.to_path_buf()
                };
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                self.read_content(&node.id, File::create(&target)?)?;
                Ok(())
            }
            NodeKind::Directory(_) => {
                std::fs::create_dir_all(local)?;
                for child in self.children(&node.id)? {
                    match &child.kind {
                        NodeKind::Directory(_) => {
                            self.export_files(&child.id, &local.join(&child.name))?
                        }
                        NodeKind::File(_) => {
                            let target = local.join(&child.name);
                            self.read_content(&child.id, File::create(&target)?)?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn name_of(path: &Path) -> Result<String, FsError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| FsError::InvalidName(path.display().to_string()))
}

/// Stream a local file through the digest reader without buffering it.
fn file_md5(path: &Path) -> Result<String, FsError> {
    let mut reader = DigestReader::new(File::open(path)?);
    io::copy(&mut reader, &mut io::sink())?;
    Ok(reader.md5_hex())
}
