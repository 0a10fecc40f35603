//! Logging setup.
//!
//! Structured logging built on the `tracing` crate: configurable level,
//! text or JSON format, and stdout/stderr/file destinations, with
//! `CANOPY_LOG*` environment variables taking precedence over the
//! configuration file.

use crate::error::FsError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error, off
    #[serde(default = "default_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr, file, or file+stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; defaults to the platform
    /// state directory.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Colored output (text format on a terminal destination).
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific level overrides.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Default log file location under the platform state directory.
pub fn default_log_file_path() -> Result<PathBuf, FsError> {
    let dirs = directories::ProjectDirs::from("", "canopy", "canopy").ok_or_else(|| {
        FsError::Config("could not determine platform state directory for log file".to_string())
    })?;
    let state = dirs
        .state_dir()
        .or_else(|| Some(dirs.data_dir()))
        .ok_or_else(|| FsError::Config("platform state directory not available".to_string()))?;
    Ok(state.join("canopy.log"))
}

/// Initialize the global tracing subscriber.
///
/// `CANOPY_LOG` (filter), `CANOPY_LOG_FORMAT`, `CANOPY_LOG_OUTPUT`, and
/// `CANOPY_LOG_FILE` override the configuration.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), FsError> {
    if config.map(|c| !c.enabled).unwrap_or(false) {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .init();
        return Ok(());
    }

    let filter = build_env_filter(config)?;
    let format = std::env::var("CANOPY_LOG_FORMAT")
        .ok()
        .unwrap_or_else(|| config.map(|c| c.format.clone()).unwrap_or_else(default_format));
    if format != "json" && format != "text" {
        return Err(FsError::Config(format!(
            "invalid log format {:?} (json or text)",
            format
        )));
    }
    let output = std::env::var("CANOPY_LOG_OUTPUT")
        .ok()
        .unwrap_or_else(|| config.map(|c| c.output.clone()).unwrap_or_else(default_output));
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let writer = make_writer(&output, config)?;
    let base = Registry::default().with(filter);
    if format == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(writer),
        )
        .init();
    } else {
        let ansi = use_color && !output.contains("file");
        base.with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .init();
    }
    Ok(())
}

fn make_writer(output: &str, config: Option<&LoggingConfig>) -> Result<BoxMakeWriter, FsError> {
    let open_file = || -> Result<std::fs::File, FsError> {
        let path = std::env::var("CANOPY_LOG_FILE")
            .ok()
            .map(PathBuf::from)
            .or_else(|| config.and_then(|c| c.file.clone()))
            .map(Ok)
            .unwrap_or_else(default_log_file_path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FsError::Config(format!("failed to create log directory: {}", e)))?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FsError::Config(format!("failed to open log file {:?}: {}", path, e)))
    };

    match output {
        "stdout" => Ok(BoxMakeWriter::new(std::io::stdout)),
        "stderr" => Ok(BoxMakeWriter::new(std::io::stderr)),
        "file" => Ok(BoxMakeWriter::new(open_file()?)),
        "file+stderr" => Ok(BoxMakeWriter::new(open_file()?.and(std::io::stderr))),
        other => Err(FsError::Config(format!(
            "invalid log output {:?} (stdout, stderr, file, or file+stderr)",
            other
        ))),
    }
}

fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, FsError> {
    if let Ok(filter) = EnvFilter::try_from_env("CANOPY_LOG") {
        return Ok(filter);
    }
    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    let mut filter = EnvFilter::new(level);
    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(directive.parse().map_err(|e| {
                FsError::Config(format!("invalid log directive {:?}: {}", directive, e))
            })?);
        }
    }
    Ok(filter)
}
