//! Remote content store over an opaque HTTP transport.
//!
//! Models backends like document repositories and streaming media servers:
//! the server owns item ids and the wire format; this side only speaks the
//! three-operation store contract.

use super::{ContentStore, FileAttrs};
use crate::error::StoreError;
use crate::types::StorageId;
use reqwest::blocking::{Body, Client};
use reqwest::StatusCode;
use serde::Deserialize;
use std::io::{self, Read, Seek, SeekFrom, Write};

pub struct RemoteStore {
    base_url: String,
    client: Client,
}

/// Item descriptor returned by the remote side on store.
#[derive(Debug, Deserialize)]
struct StoredItem {
    id: String,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn item_url(&self, storage_id: &str) -> String {
        format!("{}/{}", self.base_url, storage_id)
    }
}

impl ContentStore for RemoteStore {
    fn store(&self, file: &FileAttrs, src: &mut dyn Read) -> Result<StorageId, StoreError> {
        // The HTTP client needs an owned, rewindable body; spool to an
        // anonymous temp file so arbitrarily large content never sits in
        // memory.
        let mut spool = tempfile::tempfile()?;
        let len = io::copy(src, &mut spool)?;
        spool.flush()?;
        spool.seek(SeekFrom::Start(0))?;

        let item: StoredItem = self
            .client
            .post(&self.base_url)
            .header("x-file-name", file.name.clone())
            .header("content-type", "application/octet-stream")
            .body(Body::sized(spool, len))
            .send()?
            .error_for_status()?
            .json()?;
        tracing::debug!(storage_id = %item.id, len, "stored remote content");
        Ok(item.id)
    }

    fn retrieve(&self, storage_id: &str, out: &mut dyn Write) -> Result<u64, StoreError> {
        let response = self.client.get(self.item_url(storage_id)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::MissingContent(storage_id.to_string()));
        }
        let mut response = response.error_for_status()?;
        Ok(response.copy_to(out)?)
    }

    fn delete(&self, storage_id: &str) -> Result<(), StoreError> {
        let response = self.client.delete(self.item_url(storage_id)).send()?;
        // Absent content is not an error.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }
}
