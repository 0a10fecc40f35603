//! Audio/video technical-metadata plugin contract.
//!
//! Extraction itself is an external concern; a deployment that wants
//! duration or bit-rate columns registers a probe, and the tree caches the
//! probed result on the file node.

use crate::content::FileAttrs;
use crate::error::FsError;
use serde::{Deserialize, Serialize};

/// Technical metadata of an audio/video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_url: Option<String>,
}

/// Plugin extracting technical metadata from a file's header bytes.
///
/// Returning `Ok(None)` means the probe does not understand the content;
/// that is not an error.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, file: &FileAttrs, header: &[u8]) -> Result<Option<MediaInfo>, FsError>;
}
