//! Content-type detection.
//!
//! Classification is driven by a declarative rule set: per content type a
//! list of extension rules and a list of byte-pattern (magic) rules, each
//! carrying a weight. Detection scores every type additively over filename
//! and header matches and returns the highest cumulative score above zero,
//! falling back to the configured default type. Rules are data, loadable and
//! reloadable from a TOML file without a rebuild.

use crate::error::FsError;
use crate::types::ContentTypeId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Filename-extension match rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRule {
    /// Extension without the dot, matched case-insensitively.
    pub pattern: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// Byte-pattern encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagicFormat {
    Hex,
    Text,
}

/// Header byte-pattern match rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicRule {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_format")]
    pub format: MagicFormat,
    pub value: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// One content type with its detection rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeDef {
    pub id: ContentTypeId,
    pub mime: String,
    #[serde(default, rename = "extension")]
    pub extensions: Vec<ExtensionRule>,
    #[serde(default, rename = "magic")]
    pub magic: Vec<MagicRule>,
}

/// Declarative rule set as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Type returned when nothing scores above zero.
    pub default: ContentTypeId,
    #[serde(default, rename = "type")]
    pub types: Vec<ContentTypeDef>,
}

fn default_weight() -> u32 {
    50
}

fn default_format() -> MagicFormat {
    MagicFormat::Hex
}

struct CompiledMagic {
    offset: usize,
    bytes: Vec<u8>,
    weight: u32,
}

struct CompiledType {
    def: ContentTypeDef,
    magic: Vec<CompiledMagic>,
}

struct Compiled {
    default: ContentTypeId,
    types: Vec<CompiledType>,
}

/// Reloadable content-type registry.
pub struct ContentTypeRegistry {
    inner: RwLock<Compiled>,
}

impl ContentTypeRegistry {
    /// Build a registry from a rule set, validating every byte pattern.
    pub fn from_rules(rules: RuleSet) -> Result<Self, FsError> {
        Ok(Self {
            inner: RwLock::new(compile(rules)?),
        })
    }

    /// Load a rule set from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, FsError> {
        Self::from_rules(read_rules(path)?)
    }

    /// Replace the active rule set from disk. The registry keeps serving the
    /// old rules if the new file fails to parse or validate.
    pub fn reload_from_path(&self, path: &Path) -> Result<(), FsError> {
        let compiled = compile(read_rules(path)?)?;
        *self.inner.write() = compiled;
        Ok(())
    }

    /// Classify content from its name and header bytes.
    pub fn detect(&self, name: &str, header: &[u8]) -> ContentTypeId {
        let inner = self.inner.read();
        let ext = name
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();

        let mut best: Option<(&CompiledType, u32)> = None;
        for ty in &inner.types {
            let mut score: u32 = 0;
            for rule in &ty.def.extensions {
                if !ext.is_empty() && rule.pattern.eq_ignore_ascii_case(&ext) {
                    score += rule.weight;
                }
            }
            for magic in &ty.magic {
                let end = magic.offset + magic.bytes.len();
                if header.len() >= end && &header[magic.offset..end] == magic.bytes.as_slice() {
                    score += magic.weight;
                }
            }
            if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((ty, score));
            }
        }

        best.map(|(ty, _)| ty.def.id.clone())
            .unwrap_or_else(|| inner.default.clone())
    }

    /// Look up a type definition; unknown ids are a configuration error.
    pub fn get(&self, id: &str) -> Result<ContentTypeDef, FsError> {
        let inner = self.inner.read();
        if id == inner.default && !inner.types.iter().any(|t| t.def.id == id) {
            return Ok(fallback_def(&inner.default));
        }
        inner
            .types
            .iter()
            .find(|t| t.def.id == id)
            .map(|t| t.def.clone())
            .ok_or_else(|| FsError::UnknownContentType(id.to_string()))
    }

    /// The configured fallback type.
    pub fn default_type(&self) -> ContentTypeId {
        self.inner.read().default.clone()
    }

    /// Compiled-in baseline rule set covering common types.
    pub fn builtin() -> Self {
        Self::from_rules(builtin_rules()).expect("builtin rules are valid")
    }
}

fn fallback_def(id: &str) -> ContentTypeDef {
    ContentTypeDef {
        id: id.to_string(),
        mime: "application/octet-stream".to_string(),
        extensions: Vec::new(),
        magic: Vec::new(),
    }
}

fn read_rules(path: &Path) -> Result<RuleSet, FsError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FsError::Config(format!(
            "failed to read content-type rules {}: {}",
            path.display(),
            e
        ))
    })?;
    toml::from_str(&content).map_err(|e| {
        FsError::Config(format!(
            "failed to parse content-type rules {}: {}",
            path.display(),
            e
        ))
    })
}

fn compile(rules: RuleSet) -> Result<Compiled, FsError> {
    let mut types = Vec::with_capacity(rules.types.len());
    for def in rules.types {
        let mut magic = Vec::with_capacity(def.magic.len());
        for rule in &def.magic {
            let bytes = match rule.format {
                MagicFormat::Hex => hex::decode(&rule.value).map_err(|e| {
                    FsError::Config(format!(
                        "bad hex pattern {:?} for type {:?}: {}",
                        rule.value, def.id, e
                    ))
                })?,
                MagicFormat::Text => rule.value.as_bytes().to_vec(),
            };
            if bytes.is_empty() {
                return Err(FsError::Config(format!(
                    "empty byte pattern for type {:?}",
                    def.id
                )));
            }
            magic.push(CompiledMagic {
                offset: rule.offset,
                bytes,
                weight: rule.weight,
            });
        }
        types.push(CompiledType { def, magic });
    }
    Ok(Compiled {
        default: rules.default,
        types,
    })
}

macro_rules! ext {
    ($pattern:expr, $weight:expr) => {
        ExtensionRule {
            pattern: $pattern.to_string(),
            weight: $weight,
        }
    };
}

macro_rules! magic {
    ($offset:expr, $format:expr, $value:expr, $weight:expr) => {
        MagicRule {
            offset: $offset,
            format: $format,
            value: $value.to_string(),
            weight: $weight,
        }
    };
}

fn builtin_rules() -> RuleSet {
    use MagicFormat::{Hex, Text};
    let ty = |id: &str, mime: &str, extensions: Vec<ExtensionRule>, magic: Vec<MagicRule>| {
        ContentTypeDef {
            id: id.to_string(),
            mime: mime.to_string(),
            extensions,
            magic,
        }
    };
    RuleSet {
        default: "binary".to_string(),
        types: vec![
            ty(
                "text",
                "text/plain",
                vec![ext!("txt", 50), ext!("log", 40), ext!("md", 40)],
                vec![],
            ),
            ty(
                "html",
                "text/html",
                vec![ext!("html", 50), ext!("htm", 50)],
                vec![magic!(0, Text, "<!DOCTYPE html", 80), magic!(0, Text, "<html", 80)],
            ),
            ty(
                "jpeg",
                "image/jpeg",
                vec![ext!("jpg", 50), ext!("jpeg", 50)],
                vec![magic!(0, Hex, "ffd8ff", 80)],
            ),
            ty(
                "png",
                "image/png",
                vec![ext!("png", 50)],
                vec![magic!(0, Hex, "89504e470d0a1a0a", 80)],
            ),
            ty(
                "gif",
                "image/gif",
                vec![ext!("gif", 50)],
                vec![magic!(0, Text, "GIF87a", 80), magic!(0, Text, "GIF89a", 80)],
            ),
            ty(
                "pdf",
                "application/pdf",
                vec![ext!("pdf", 50)],
                vec![magic!(0, Text, "%PDF-", 80)],
            ),
            ty(
                "zip",
                "application/zip",
                vec![ext!("zip", 50)],
                vec![magic!(0, Hex, "504b0304", 80)],
            ),
            ty(
                "mp3",
                "audio/mpeg",
                vec![ext!("mp3", 50)],
                vec![magic!(0, Text, "ID3", 60)],
            ),
            ty(
                "mp4",
                "video/mp4",
                vec![ext!("mp4", 50), ext!("m4v", 40)],
                vec![magic!(4, Text, "ftyp", 70)],
            ),
            ty(
                "mpeg",
                "video/mpeg",
                vec![ext!("mpg", 50), ext!("mpeg", 50)],
                vec![magic!(0, Hex, "000001ba", 70)],
            ),
            ty(
                "binary",
                "application/octet-stream",
                vec![ext!("bin", 30)],
                vec![],
            ),
        ],
    }
}
