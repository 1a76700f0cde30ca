// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload codecs.
//!
//! A codec turns serialized message bytes into a [`Payload`] whose stamp
//! layout is resolved once, and turns it back into bytes after the stamps
//! were rewritten. Every field that is not a header stamp must survive the
//! round trip; byte-for-byte stability is not required.
//!
//! [`JsonCodec`] handles messages serialized as JSON in the ROS 2 message
//! layout:
//!
//! ```json
//! {"header": {"stamp": {"sec": 12, "nanosec": 500}, "frame_id": "map"}, "data": 1}
//! ```

use crate::bag::TopicInfo;
use crate::payload::{Payload, PayloadStamps};
use crate::time::TimeValue;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Transform list: one stamp per transform, deferrable.
pub const TF_MESSAGE_TYPE: &str = "tf2_msgs/msg/TFMessage";

/// Marker list: one stamp per marker.
pub const MARKER_ARRAY_TYPE: &str = "visualization_msgs/msg/MarkerArray";

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Invalid stamp on {topic}: {reason}")]
    InvalidStamp { topic: String, reason: String },
}

/// Decode/encode collaborator of the restamp engine.
pub trait Codec {
    /// Non-stamp remainder of a decoded message.
    ///
    /// Deferred bodies are cloned for encoding, so a failed flush leaves the
    /// buffer intact.
    type Body: Clone;

    /// Decode a serialized message received on `topic`.
    fn decode(&self, topic: &str, data: &[u8]) -> Result<Payload<Self::Body>, CodecError>;

    /// Serialize a payload, writing its stamps back into the message.
    fn encode(&self, payload: Payload<Self::Body>) -> Result<Vec<u8>, CodecError>;
}

/// Where the stamps of a JSON message live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampLayout {
    /// `header.stamp`
    Header,
    /// `<field>[*].header.stamp`
    Elements(&'static str),
    /// No stamp.
    None,
}

/// JSON message body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody {
    /// The full message, stamps included as decoded.
    pub message: Value,
    /// Stamp positions inside `message`.
    pub layout: StampLayout,
}

/// Codec for JSON-serialized ROS 2 messages.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    types: HashMap<String, String>,
}

impl JsonCodec {
    /// Create a codec with no known topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec knowing every topic of the catalogue.
    pub fn from_catalogue<'a, I>(catalogue: I) -> Self
    where
        I: IntoIterator<Item = &'a TopicInfo>,
    {
        let mut codec = Self::new();
        for topic in catalogue {
            codec.register_topic(&topic.name, &topic.type_name);
        }
        codec
    }

    /// Register the message type of a topic.
    pub fn register_topic(&mut self, topic: &str, type_name: &str) {
        self.types.insert(topic.to_string(), type_name.to_string());
    }

    /// Message type of a registered topic.
    pub fn type_name(&self, topic: &str) -> Option<&str> {
        self.types.get(topic).map(String::as_str)
    }

    /// Stamp layout of a message.
    ///
    /// A top-level header wins over the type name.
    fn layout_of(type_name: &str, message: &Value) -> StampLayout {
        if message.get("header").and_then(|h| h.get("stamp")).is_some() {
            return StampLayout::Header;
        }
        match type_name {
            TF_MESSAGE_TYPE => StampLayout::Elements("transforms"),
            MARKER_ARRAY_TYPE => StampLayout::Elements("markers"),
            _ => StampLayout::None,
        }
    }
}

impl Codec for JsonCodec {
    type Body = JsonBody;

    fn decode(&self, topic: &str, data: &[u8]) -> Result<Payload<JsonBody>, CodecError> {
        let type_name = self
            .type_name(topic)
            .ok_or_else(|| CodecError::UnknownTopic(topic.to_string()))?;
        let message: Value = serde_json::from_slice(data)?;
        let layout = Self::layout_of(type_name, &message);

        let stamps = match layout {
            StampLayout::Header => PayloadStamps::Single(read_header_stamp(topic, &message)?),
            StampLayout::Elements(field) => {
                let elements = match message.get(field).and_then(Value::as_array) {
                    Some(items) => items
                        .iter()
                        .map(|item| read_header_stamp(topic, item))
                        .collect::<Result<Vec<_>, _>>()?,
                    None => Vec::new(),
                };
                PayloadStamps::Multi {
                    elements,
                    deferral_eligible: type_name == TF_MESSAGE_TYPE,
                }
            }
            StampLayout::None => PayloadStamps::Unstamped,
        };

        Ok(Payload {
            stamps,
            body: JsonBody { message, layout },
        })
    }

    fn encode(&self, payload: Payload<JsonBody>) -> Result<Vec<u8>, CodecError> {
        let JsonBody {
            mut message,
            layout,
        } = payload.body;

        match (&payload.stamps, layout) {
            (PayloadStamps::Single(t), StampLayout::Header) => {
                write_header_stamp(&mut message, *t);
            }
            (PayloadStamps::Multi { elements, .. }, StampLayout::Elements(field)) => {
                if let Some(items) = message.get_mut(field).and_then(Value::as_array_mut) {
                    for (item, t) in items.iter_mut().zip(elements) {
                        write_header_stamp(item, *t);
                    }
                }
            }
            _ => {}
        }

        Ok(serde_json::to_vec(&message)?)
    }
}

fn read_header_stamp(topic: &str, value: &Value) -> Result<TimeValue, CodecError> {
    let invalid = |reason: &str| CodecError::InvalidStamp {
        topic: topic.to_string(),
        reason: reason.to_string(),
    };

    let stamp = value
        .get("header")
        .and_then(|h| h.get("stamp"))
        .ok_or_else(|| invalid("missing header.stamp"))?;
    let sec = stamp
        .get("sec")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid("sec is not an integer"))?;
    let nanosec = stamp
        .get("nanosec")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid("nanosec is not an integer"))?;

    Ok(TimeValue::from_stamp(sec, nanosec))
}

fn write_header_stamp(value: &mut Value, t: TimeValue) {
    let (sec, nanosec) = t.to_stamp();
    let stamp = json!({ "sec": sec, "nanosec": nanosec });

    if let Some(object) = value.as_object_mut() {
        let header = object
            .entry("header")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(header) = header.as_object_mut() {
            header.insert("stamp".to_string(), stamp);
        }
    }
}
