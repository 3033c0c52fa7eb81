//! Converter configuration.
//!
//! [`ConverterConfig`] holds the few knobs that change how documents are
//! converted. It is plain serde data, persisted as TOML by front ends
//! (the CLI reads `~/.config/sidemark/config.toml` on Unix systems); the core
//! only parses and formats it.
//!
//! # Example
//!
//! ```
//! use sidemark_core::config::{ConverterConfig, TableMode};
//!
//! let config = ConverterConfig::from_toml_str("tables = \"placeholder\"").unwrap();
//! assert_eq!(config.tables, TableMode::Placeholder);
//! assert_eq!(config.words_per_minute, 200);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sidecar::DEFAULT_WORDS_PER_MINUTE;

/// How table nodes are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMode {
    /// Readable pipe rendering in the text, full structure in the sidecar
    #[default]
    Sidecar,
    /// A `<!-- table -->` placeholder only; the table is lost on reload
    Placeholder,
}

/// What the deserializer does when an `@img:` reference cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingImagePolicy {
    /// Propagate the store's error to the caller
    #[default]
    Fail,
    /// Log a warning and leave the `@img:` reference as the image source
    KeepReference,
}

/// `ConverterConfig` is the part of the converter a user can configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Reading speed for the reading-time estimate
    pub words_per_minute: u32,

    /// Table handling
    pub tables: TableMode,

    /// Handling of unresolvable image references
    pub missing_images: MissingImagePolicy,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            tables: TableMode::default(),
            missing_images: MissingImagePolicy::default(),
        }
    }
}

impl ConverterConfig {
    /// Parse from TOML. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Format as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
