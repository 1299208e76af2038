//! Sizer and memory-statistics configuration
//!
//! Both structures can be loaded from TOML or JSON, picked by file
//! extension.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scope stack limit; deeper nesting means a cycle in a walker.
pub const DEFAULT_MAX_SCOPE_DEPTH: usize = 128;

/// Largest accepted byte threshold (256 MB).
pub const MAX_SUBCOMPONENT_BYTES: i64 = 0x1000_0000;

/// Behaviour of a single [`Sizer`](crate::Sizer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizerConfig {
    /// Whether "Textures" and "textures" pushed under the same parent are
    /// separate components
    pub case_sensitive_names: bool,

    /// Maximum scope stack depth, root included
    pub max_scope_depth: usize,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            case_sensitive_names: true,
            max_scope_depth: DEFAULT_MAX_SCOPE_DEPTH,
        }
    }
}

impl SizerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_scope_depth < 2 {
            return Err(ConfigError::ScopeDepthTooSmall(self.max_scope_depth));
        }
        Ok(())
    }
}

/// Refresh and display policy for the periodic memory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemStatsConfig {
    /// Rebuild interval in milliseconds; 0 switches the report off
    pub refresh_interval_ms: u64,

    /// Display threshold: rows at or below this many bytes are hidden
    pub min_subcomponent_bytes: i64,

    /// Display depth: deeper rows are hidden
    pub max_depth: u32,

    /// Build threshold: subtrees at or below this many bytes are dropped
    /// from the snapshot entirely
    pub builder_min_bytes: i64,

    /// Rows per on-screen page
    pub page_rows: usize,

    /// Dump sizes in KB instead of MB
    pub use_kilobytes: bool,

    /// Settings for the sizer the report is collected with
    pub sizer: SizerConfig,
}

impl Default for MemStatsConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 0,
            min_subcomponent_bytes: 32000,
            max_depth: 4,
            builder_min_bytes: 0,
            page_rows: 64,
            use_kilobytes: false,
            sizer: SizerConfig::default(),
        }
    }
}

impl MemStatsConfig {
    /// Report switched on, refreshed once per second
    pub fn enabled() -> Self {
        Self {
            refresh_interval_ms: 1000,
            ..Default::default()
        }
    }

    /// Everything above 256 bytes, down to depth 16
    pub fn detailed() -> Self {
        Self {
            refresh_interval_ms: 1000,
            min_subcomponent_bytes: 256,
            max_depth: 16,
            builder_min_bytes: 0,
            page_rows: 64,
            use_kilobytes: true,
            sizer: SizerConfig::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.refresh_interval_ms > 0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_SUBCOMPONENT_BYTES).contains(&self.builder_min_bytes) {
            return Err(ConfigError::ThresholdOutOfRange(self.builder_min_bytes));
        }
        if self.page_rows == 0 {
            return Err(ConfigError::EmptyPage);
        }
        self.sizer.validate()
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::parse(&content, format)
    }

    /// Load from a string in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Export as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Scope depth limit {0} too small (minimum 2)")]
    ScopeDepthTooSmall(usize),

    #[error("Build threshold {0} outside [0, 0x10000000]")]
    ThresholdOutOfRange(i64),

    #[error("Page must hold at least one row")]
    EmptyPage,

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
