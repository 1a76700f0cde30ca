// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON Lines bag files.
//!
//! # Format
//!
//! ```text
//! {"topics":[{"name":"/tf","type_name":"tf2_msgs/msg/TFMessage","message_count":2}]}
//! {"topic":"/tf","timestamp":1000,"data":{"transforms":[...]}}
//! {"topic":"/tf","timestamp":2000,"data":{"transforms":[...]}}
//! ```
//!
//! The first line holds the metadata (topic catalogue). Every following line
//! is one message: topic name, bag timestamp in nanoseconds and the message
//! serialized as JSON.

use crate::engine::Emission;
use crate::time::TimeValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Bag file errors.
#[derive(Debug, Error)]
pub enum BagError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing metadata line")]
    MissingMetadata,

    #[error("Malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Topic information for metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Topic name.
    pub name: String,

    /// Type name.
    pub type_name: String,

    /// Message count in the bag.
    #[serde(default)]
    pub message_count: u64,
}

impl TopicInfo {
    /// Create topic information.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, message_count: u64) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            message_count,
        }
    }
}

/// Bag metadata (first line of the file).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagMetadata {
    /// Topic catalogue.
    #[serde(default)]
    pub topics: Vec<TopicInfo>,
}

/// One message line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BagLine {
    topic: String,
    timestamp: TimeValue,
    data: Value,
}

/// A serialized message read from a bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Topic name.
    pub topic: String,

    /// Serialized message.
    pub data: Vec<u8>,

    /// Bag timestamp.
    pub timestamp: TimeValue,
}

/// Bag file reader.
pub struct BagReader {
    lines: io::Lines<BufReader<File>>,
    metadata: BagMetadata,
    line_number: usize,
}

impl BagReader {
    /// Open a bag file and read its metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BagError> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let first = lines.next().ok_or(BagError::MissingMetadata)??;
        let metadata: BagMetadata = serde_json::from_str(&first)?;

        Ok(Self {
            lines,
            metadata,
            line_number: 1,
        })
    }

    /// Get bag metadata.
    pub fn metadata(&self) -> &BagMetadata {
        &self.metadata
    }

    /// Topic catalogue.
    pub fn topics(&self) -> &[TopicInfo] {
        &self.metadata.topics
    }

    /// Read the next message, skipping blank lines.
    pub fn read_record(&mut self) -> Result<Option<RawRecord>, BagError> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            let parsed: BagLine =
                serde_json::from_str(&line).map_err(|source| BagError::MalformedRecord {
                    line: self.line_number,
                    source,
                })?;

            return Ok(Some(RawRecord {
                topic: parsed.topic,
                data: serde_json::to_vec(&parsed.data)?,
                timestamp: parsed.timestamp,
            }));
        }

        Ok(None)
    }
}

/// Bag file writer.
pub struct BagWriter {
    writer: BufWriter<File>,
    written: BTreeMap<String, u64>,
}

impl BagWriter {
    /// Create a bag file and write its metadata line.
    pub fn create<P: AsRef<Path>>(path: P, metadata: &BagMetadata) -> Result<Self, BagError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer(&mut writer, metadata)?;
        writer.write_all(b"\n")?;

        Ok(Self {
            writer,
            written: BTreeMap::new(),
        })
    }

    /// Write a serialized message.
    pub fn write_record(
        &mut self,
        topic: &str,
        data: &[u8],
        timestamp: TimeValue,
    ) -> Result<(), BagError> {
        let line = BagLine {
            topic: topic.to_string(),
            timestamp,
            data: serde_json::from_slice(data)?,
        };

        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;

        *self.written.entry(line.topic).or_default() += 1;
        Ok(())
    }

    /// Write a restamped record.
    pub fn write_emission(&mut self, emission: &Emission) -> Result<(), BagError> {
        self.write_record(&emission.topic, &emission.data, emission.timestamp)
    }

    /// Flush to disk, returning the number of messages written per topic.
    pub fn finalize(mut self) -> Result<BTreeMap<String, u64>, BagError> {
        self.writer.flush()?;
        Ok(self.written)
    }
}
