// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Restamp configuration.
//!
//! Supports both programmatic and file-based configuration.
//!
//! ```toml
//! invert = false
//! offset_topics = ["/camera/.*", "/scan"]
//! offset = "0.25"
//! offset_header = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
///
/// All of these are raised while building an engine, before any record is
/// processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid offset '{0}': expected integer nanoseconds or float seconds")]
    InvalidOffset(String),

    #[error("Invalid offset topic pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Restamp filter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestampConfig {
    /// Write bag timestamps into message headers instead of the reverse.
    #[serde(default)]
    pub invert: bool,

    /// Topic patterns (regular expressions, matched from the start of the
    /// topic name) that receive the constant offset.
    #[serde(default)]
    pub offset_topics: Vec<String>,

    /// Offset in integer nanoseconds or float seconds.
    #[serde(default = "default_offset")]
    pub offset: String,

    /// Also apply the offset to the header stamps of offset topics.
    #[serde(default)]
    pub offset_header: bool,
}

fn default_offset() -> String {
    "0".to_string()
}

impl Default for RestampConfig {
    fn default() -> Self {
        Self {
            invert: false,
            offset_topics: Vec::new(),
            offset: default_offset(),
            offset_header: false,
        }
    }
}

impl RestampConfig {
    /// Create a config with defaults (forward mode, no offset).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Select invert mode.
    pub fn invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Add an offset topic pattern.
    pub fn offset_topic(mut self, pattern: impl Into<String>) -> Self {
        self.offset_topics.push(pattern.into());
        self
    }

    /// Set the offset string.
    pub fn offset(mut self, offset: impl Into<String>) -> Self {
        self.offset = offset.into();
        self
    }

    /// Enable header offsetting.
    pub fn offset_header(mut self, enable: bool) -> Self {
        self.offset_header = enable;
        self
    }
}
