// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Constant per-topic time offsets.
//!
//! Offset topics are given as regular expressions. They are resolved once
//! against the topic catalogue of the input; topics that show up later in
//! the stream never join the set.

use crate::bag::TopicInfo;
use crate::config::{ConfigError, RestampConfig};
use crate::time::{TimeOffset, NANOS_PER_SEC};
use regex::Regex;
use std::collections::HashSet;

/// Parse an offset given as integer nanoseconds or float seconds.
///
/// `"250"` is 250 ns, `"0.25"` is 250 ms. Float seconds are truncated toward
/// zero once converted to nanoseconds.
pub fn parse_offset(value: &str) -> Result<TimeOffset, ConfigError> {
    let trimmed = value.trim();

    if let Ok(nanos) = trimmed.parse::<i64>() {
        return Ok(TimeOffset::from_nanos(nanos));
    }

    let secs: f64 = trimmed
        .parse()
        .map_err(|_| ConfigError::InvalidOffset(value.to_string()))?;
    let nanos = secs * NANOS_PER_SEC as f64;

    if !nanos.is_finite() || nanos >= i64::MAX as f64 || nanos < i64::MIN as f64 {
        return Err(ConfigError::InvalidOffset(value.to_string()));
    }

    Ok(TimeOffset::from_nanos(nanos.trunc() as i64))
}

/// Resolved offset configuration.
#[derive(Debug, Clone, Default)]
pub struct OffsetPolicy {
    topics: HashSet<String>,
    offset: TimeOffset,
    header: bool,
}

impl OffsetPolicy {
    /// Resolve `patterns` against every topic of the catalogue.
    ///
    /// A pattern matches when the regex matches at the start of the topic
    /// name; it does not have to consume the whole name.
    pub fn resolve<'a, I>(
        patterns: &[String],
        catalogue: I,
        offset: TimeOffset,
        header: bool,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a TopicInfo>,
    {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})", p)).map_err(|source| ConfigError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let topics: HashSet<String> = catalogue
            .into_iter()
            .filter(|topic| compiled.iter().any(|re| re.is_match(&topic.name)))
            .map(|topic| topic.name.clone())
            .collect();

        for topic in &topics {
            tracing::debug!("Offset topic: {}", topic);
        }

        Ok(Self {
            topics,
            offset,
            header,
        })
    }

    /// Build the policy described by `config`.
    pub fn from_config<'a, I>(config: &RestampConfig, catalogue: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a TopicInfo>,
    {
        let offset = parse_offset(&config.offset)?;
        Self::resolve(
            &config.offset_topics,
            catalogue,
            offset,
            config.offset_header,
        )
    }

    /// Whether `topic` receives the offset.
    pub fn applies_to(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// Whether header stamps of `topic` are shifted too.
    pub fn applies_to_header(&self, topic: &str) -> bool {
        self.header && self.applies_to(topic)
    }

    /// The configured offset.
    pub fn offset(&self) -> TimeOffset {
        self.offset
    }

    /// Resolved offset topics.
    pub fn topics(&self) -> &HashSet<String> {
        &self.topics
    }

    /// Whether header offsetting is enabled.
    pub fn header_enabled(&self) -> bool {
        self.header
    }
}
