//! Layered configuration.
//!
//! A `CanopyConfig` describes the metadata store, cache, content stores,
//! store-selection routes, content-type rules, and logging. Loaded from a
//! TOML file with `CANOPY_`-prefixed environment overrides; validated at
//! startup so every referenced store id resolves before the tree is built.

use crate::content::{ContentStore, DiskStore, MemoryStore, RemoteStore};
use crate::error::FsError;
use crate::logging::LoggingConfig;
use crate::types::{ContentTypeId, StoreId};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content-store backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Disk,
    Remote,
    Memory,
}

/// One configured content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDef {
    pub kind: StoreKind,
    /// Root directory for disk stores.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Base URL for remote stores.
    #[serde(default)]
    pub url: Option<String>,
}

impl StoreDef {
    /// Instantiate the backend this definition describes.
    pub fn build(&self) -> Result<Arc<dyn ContentStore>, FsError> {
        match self.kind {
            StoreKind::Disk => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| FsError::Config("disk store requires a path".to_string()))?;
                Ok(Arc::new(DiskStore::open(path)?))
            }
            StoreKind::Remote => {
                let url = self
                    .url
                    .as_ref()
                    .ok_or_else(|| FsError::Config("remote store requires a url".to_string()))?;
                Ok(Arc::new(RemoteStore::new(url.clone())))
            }
            StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }

    fn validate(&self, id: &str) -> Result<(), FsError> {
        match self.kind {
            StoreKind::Disk if self.path.is_none() => Err(FsError::Config(format!(
                "store {:?} is a disk store without a path",
                id
            ))),
            StoreKind::Remote if self.url.is_none() => Err(FsError::Config(format!(
                "store {:?} is a remote store without a url",
                id
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanopyConfig {
    /// Sled metadata database location.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Bound of the node LRU cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Content-type rule file; the compiled-in baseline applies when unset.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// Store receiving content no route claims.
    #[serde(default = "default_store_id")]
    pub default_store: StoreId,

    /// Configured content stores by id.
    #[serde(default = "default_stores")]
    pub stores: HashMap<StoreId, StoreDef>,

    /// Content-type to store-id routing table.
    #[serde(default)]
    pub routes: HashMap<ContentTypeId, StoreId>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("./canopy-meta")
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_store_id() -> StoreId {
    "disk".to_string()
}

fn default_stores() -> HashMap<StoreId, StoreDef> {
    let mut stores = HashMap::new();
    stores.insert(
        "disk".to_string(),
        StoreDef {
            kind: StoreKind::Disk,
            path: Some(PathBuf::from("./canopy-data")),
            url: None,
        },
    );
    stores
}

impl Default for CanopyConfig {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            cache_capacity: default_cache_capacity(),
            rules_path: None,
            default_store: default_store_id(),
            stores: default_stores(),
            routes: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CanopyConfig {
    /// Load from an optional file plus `CANOPY_`-prefixed environment
    /// overrides (`CANOPY_CACHE_CAPACITY`, `CANOPY_DEFAULT_STORE`, ...).
    pub fn load(path: Option<&Path>) -> Result<Self, FsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }
        let loaded: Self = builder
            .add_source(Environment::with_prefix("CANOPY").separator("__"))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| FsError::Config(e.to_string()))?;
        Ok(loaded)
    }

    /// Startup validation: every referenced store id resolves and every
    /// store definition carries the parameters its kind needs.
    pub fn validate(&self) -> Result<(), FsError> {
        if self.cache_capacity == 0 {
            return Err(FsError::Config("cache_capacity must be positive".to_string()));
        }
        for (id, def) in &self.stores {
            def.validate(id)?;
        }
        if !self.stores.contains_key(&self.default_store) {
            return Err(FsError::UnknownStore(self.default_store.clone()));
        }
        for store in self.routes.values() {
            if !self.stores.contains_key(store) {
                return Err(FsError::UnknownStore(store.clone()));
            }
        }
        Ok(())
    }
}
