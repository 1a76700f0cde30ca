// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bag Restamp Filter
//!
//! Correct recorded message timestamps using the header stamps embedded in
//! the messages themselves:
//! - Forward mode: bag timestamp <- earliest header stamp
//! - Invert mode: header stamps <- bag timestamp
//! - Constant per-topic offsets, optionally applied to headers too
//!
//! Transform messages recorded before the clock synchronised (stamp `<= 0`)
//! are held back and emitted with the first valid stamp seen afterwards.
//!
//! # Quick Start
//!
//! ```bash
//! # Restamp from headers
//! bag-restamp --input capture.jsonl --output restamped.jsonl
//!
//! # Shift camera topics by 250 ms, headers included
//! bag-restamp --input capture.jsonl -o out.jsonl -u "/camera/.*" -c 0.25 --offset-header
//!
//! # Write bag timestamps into headers
//! bag-restamp --input capture.jsonl --output out.jsonl --invert
//! ```
//!
//! # Library Use
//!
//! ```
//! use bag_restamp::{JsonCodec, RestampConfig, RestampEngine, TimeValue, TopicInfo};
//!
//! let topics = vec![TopicInfo::new("/odom", "nav_msgs/msg/Odometry", 1)];
//! let codec = JsonCodec::from_catalogue(&topics);
//! let mut engine = RestampEngine::from_config(&RestampConfig::new(), &topics, codec).unwrap();
//!
//! let data = br#"{"header":{"stamp":{"sec":0,"nanosec":1000},"frame_id":"odom"}}"#;
//! let out = engine
//!     .process_serialized("/odom", data, TimeValue::from_nanos(1))
//!     .unwrap();
//! assert_eq!(out[0].timestamp, TimeValue::from_nanos(1000));
//! ```

pub mod bag;
pub mod codec;
pub mod config;
pub mod deferral;
pub mod engine;
pub mod offset;
pub mod payload;
pub mod time;
pub mod warn;

pub use bag::{BagError, BagMetadata, BagReader, BagWriter, RawRecord, TopicInfo};
pub use codec::{Codec, CodecError, JsonBody, JsonCodec};
pub use config::{ConfigError, RestampConfig};
pub use deferral::{DeferralBuffer, DeferredEntry};
pub use engine::{Emission, Record, RestampEngine, RestampError, RestampStats};
pub use offset::{parse_offset, OffsetPolicy};
pub use payload::{Payload, PayloadKind, PayloadStamps};
pub use time::{TimeOffset, TimeValue};
pub use warn::{WarnKind, WarnOnce};
