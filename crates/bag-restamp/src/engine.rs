// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Restamp engine.
//!
//! Forward mode replaces each bag timestamp with the earliest header stamp
//! embedded in the message. Invert mode writes the bag timestamp into every
//! header stamp. In both modes offset topics are then shifted by the
//! configured constant.
//!
//! Records must be fed in stream order: the minimum valid stamp and the
//! flush order of deferred messages both depend on it.

use crate::bag::TopicInfo;
use crate::codec::{Codec, CodecError};
use crate::config::{ConfigError, RestampConfig};
use crate::deferral::DeferralBuffer;
use crate::offset::OffsetPolicy;
use crate::payload::Payload;
use crate::time::TimeValue;
use crate::warn::{WarnKind, WarnOnce};
use thiserror::Error;

/// Engine errors.
///
/// Restamping itself never fails; errors come from the codec.
#[derive(Debug, Error)]
pub enum RestampError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// A decoded input record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<B> {
    /// Topic name.
    pub topic: String,

    /// Decoded payload.
    pub payload: Payload<B>,

    /// Bag (recorder) timestamp.
    pub timestamp: TimeValue,
}

impl<B> Record<B> {
    /// Create a record.
    pub fn new(topic: impl Into<String>, payload: Payload<B>, timestamp: TimeValue) -> Self {
        Self {
            topic: topic.into(),
            payload,
            timestamp,
        }
    }
}

/// A record ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Topic name.
    pub topic: String,

    /// Encoded payload.
    pub data: Vec<u8>,

    /// Corrected bag timestamp.
    pub timestamp: TimeValue,
}

/// Restamp statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestampStats {
    /// Records fed to the engine.
    pub records_in: u64,

    /// Records emitted, flushed ones included.
    pub emitted: u64,

    /// Records dropped for an invalid stamp.
    pub dropped: u64,

    /// Records buffered for an invalid stamp.
    pub deferred: u64,

    /// Buffered records emitted later.
    pub flushed: u64,

    /// Records emitted with their bag timestamp for lack of a header.
    pub fallback: u64,
}

/// Streaming restamp filter.
pub struct RestampEngine<C: Codec> {
    codec: C,
    policy: OffsetPolicy,
    invert: bool,
    min_valid_time: Option<TimeValue>,
    deferred: DeferralBuffer<C::Body>,
    warnings: WarnOnce,
    stats: RestampStats,
}

impl<C: Codec> RestampEngine<C> {
    /// Create an engine. The mode is fixed for the engine's lifetime.
    pub fn new(codec: C, policy: OffsetPolicy, invert: bool) -> Self {
        Self {
            codec,
            policy,
            invert,
            min_valid_time: None,
            deferred: DeferralBuffer::new(),
            warnings: WarnOnce::new(),
            stats: RestampStats::default(),
        }
    }

    /// Create an engine from a configuration and the input topic catalogue.
    ///
    /// Offset topics are resolved here, once.
    pub fn from_config<'a, I>(
        config: &RestampConfig,
        catalogue: I,
        codec: C,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a TopicInfo>,
    {
        let policy = OffsetPolicy::from_config(config, catalogue)?;

        tracing::info!(
            "Restamp mode: {}, offset {} on {} topic(s){}",
            if config.invert { "invert" } else { "forward" },
            policy.offset(),
            policy.topics().len(),
            if policy.header_enabled() {
                " (headers included)"
            } else {
                ""
            }
        );

        Ok(Self::new(codec, policy, config.invert))
    }

    /// Decode a serialized message and process it.
    pub fn process_serialized(
        &mut self,
        topic: &str,
        data: &[u8],
        timestamp: TimeValue,
    ) -> Result<Vec<Emission>, RestampError> {
        let payload = self.codec.decode(topic, data)?;
        self.process(Record::new(topic, payload, timestamp))
    }

    /// Process one record, returning zero or more records to write.
    ///
    /// On error nothing is emitted and the minimum valid stamp, the deferred
    /// buffer and the flush counters are left untouched.
    pub fn process(&mut self, record: Record<C::Body>) -> Result<Vec<Emission>, RestampError> {
        self.stats.records_in += 1;

        let emissions = if self.invert {
            self.process_invert(record)?
        } else {
            self.process_forward(record)?
        };

        self.stats.emitted += emissions.len() as u64;
        Ok(emissions)
    }

    fn process_forward(
        &mut self,
        mut record: Record<C::Body>,
    ) -> Result<Vec<Emission>, RestampError> {
        let mut fallback = false;
        let min_valid = match record.payload.min_time() {
            None => {
                let topic = &record.topic;
                self.warnings.warn(WarnKind::MissingHeader, topic, || {
                    format!("{} has no header, using bag timestamp instead", topic)
                });
                fallback = true;
                self.min_valid_time
            }
            Some(t) if t.is_valid() => {
                record.timestamp = t;
                Some(match self.min_valid_time {
                    Some(current) => current.min(t),
                    None => t,
                })
            }
            Some(t) => {
                if record.payload.is_deferral_eligible() {
                    let topic = &record.topic;
                    self.warnings.warn(WarnKind::Deferred, topic, || {
                        format!("Delaying message from {} with timestamp {}.", topic, t)
                    });
                    self.deferred.push(record.topic, record.payload, t);
                    self.stats.deferred += 1;
                } else {
                    tracing::debug!(
                        "Dropping message from {} with timestamp {}",
                        record.topic,
                        t
                    );
                    self.stats.dropped += 1;
                }
                return Ok(Vec::new());
            }
        };

        // Encode everything before touching engine state: an error leaves the
        // minimum valid stamp and the deferred buffer as they were.
        let mut emissions = vec![self.finish(record)?];
        let flushed = match min_valid {
            Some(min_valid) if !self.deferred.is_empty() => {
                Some((min_valid, self.encode_deferred(min_valid)?))
            }
            _ => None,
        };

        self.min_valid_time = min_valid;
        if fallback {
            self.stats.fallback += 1;
        }
        if let Some((min_valid, flushed)) = flushed {
            self.commit_flush(min_valid, &flushed);
            emissions.extend(flushed);
        }
        Ok(emissions)
    }

    fn process_invert(
        &mut self,
        mut record: Record<C::Body>,
    ) -> Result<Vec<Emission>, RestampError> {
        record.payload.write_time(record.timestamp);
        Ok(vec![self.finish(record)?])
    }

    /// Apply the topic offset and encode.
    fn finish(&self, mut record: Record<C::Body>) -> Result<Emission, RestampError> {
        if self.policy.applies_to(&record.topic) {
            record.timestamp += self.policy.offset();
        }
        if self.policy.applies_to_header(&record.topic) {
            record.payload.add_offset(self.policy.offset());
        }

        Ok(Emission {
            data: self.codec.encode(record.payload)?,
            topic: record.topic,
            timestamp: record.timestamp,
        })
    }

    /// Encode every deferred message with the minimum valid stamp.
    ///
    /// Header stamps of deferred messages keep their original value, shifted
    /// only by the header offset when it applies. The buffer is left as is.
    fn encode_deferred(&self, min_valid: TimeValue) -> Result<Vec<Emission>, RestampError> {
        let mut emissions = Vec::with_capacity(self.deferred.len());

        for entry in self.deferred.iter() {
            let mut payload = entry.payload.clone();
            let mut timestamp = min_valid;
            if self.policy.applies_to(&entry.topic) {
                timestamp += self.policy.offset();
            }
            if self.policy.applies_to_header(&entry.topic) {
                payload.add_offset(self.policy.offset());
            }

            emissions.push(Emission {
                data: self.codec.encode(payload)?,
                topic: entry.topic.clone(),
                timestamp,
            });
        }

        Ok(emissions)
    }

    /// Drop the deferred messages once all of them were encoded.
    fn commit_flush(&mut self, min_valid: TimeValue, flushed: &[Emission]) {
        for emission in flushed {
            let topic = &emission.topic;
            self.warnings.warn(WarnKind::AssignedMinValid, topic, || {
                format!(
                    "Assigning minimum valid timestamp {} to {} message.",
                    min_valid, topic
                )
            });
        }

        self.deferred.clear();
        self.stats.flushed += flushed.len() as u64;
    }

    /// Running minimum of all valid header stamps seen so far.
    pub fn min_valid_time(&self) -> Option<TimeValue> {
        self.min_valid_time
    }

    /// Number of deferred messages still waiting for a valid stamp.
    ///
    /// These are discarded, not flushed, when the engine is dropped.
    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// Topics of the deferred messages, in arrival order.
    pub fn pending_topics(&self) -> impl Iterator<Item = &str> {
        self.deferred.iter().map(|entry| entry.topic.as_str())
    }

    /// Whether the engine runs in invert mode.
    pub fn is_invert(&self) -> bool {
        self.invert
    }

    /// Resolved offset policy.
    pub fn policy(&self) -> &OffsetPolicy {
        &self.policy
    }

    /// Warnings logged so far.
    pub fn warnings(&self) -> &WarnOnce {
        &self.warnings
    }

    /// Get current statistics.
    pub fn stats(&self) -> &RestampStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadStamps;
    use crate::time::TimeOffset;

    /// Codec that keeps payloads as-is and renders stamps into the bytes.
    struct DebugCodec;

    impl Codec for DebugCodec {
        type Body = &'static str;

        fn decode(
            &self,
            _topic: &str,
            _data: &[u8],
        ) -> Result<Payload<&'static str>, CodecError> {
            Ok(Payload::unstamped("decoded"))
        }

        fn encode(&self, payload: Payload<&'static str>) -> Result<Vec<u8>, CodecError> {
            Ok(format!("{}:{:?}", payload.body, payload.stamps).into_bytes())
        }
    }

    /// Codec that refuses to encode the body `"bad"`.
    struct FailingCodec;

    impl Codec for FailingCodec {
        type Body = &'static str;

        fn decode(
            &self,
            _topic: &str,
            _data: &[u8],
        ) -> Result<Payload<&'static str>, CodecError> {
            Ok(Payload::unstamped("decoded"))
        }

        fn encode(&self, payload: Payload<&'static str>) -> Result<Vec<u8>, CodecError> {
            if payload.body == "bad" {
                return Err(CodecError::InvalidStamp {
                    topic: "/tf".to_string(),
                    reason: "unencodable body".to_string(),
                });
            }
            Ok(payload.body.as_bytes().to_vec())
        }
    }

    fn t(nanos: i64) -> TimeValue {
        TimeValue::from_nanos(nanos)
    }

    fn forward() -> RestampEngine<DebugCodec> {
        RestampEngine::new(DebugCodec, OffsetPolicy::default(), false)
    }

    fn with_offset(
        topic: &str,
        nanos: i64,
        header: bool,
        invert: bool,
    ) -> RestampEngine<DebugCodec> {
        let catalogue = vec![TopicInfo::new(topic, "any", 1)];
        let policy = OffsetPolicy::resolve(
            &[topic.to_string()],
            &catalogue,
            TimeOffset::from_nanos(nanos),
            header,
        )
        .expect("policy");
        RestampEngine::new(DebugCodec, policy, invert)
    }

    fn stamps_of(emission: &Emission) -> String {
        String::from_utf8(emission.data.clone()).expect("utf8")
    }

    #[test]
    fn test_forward_uses_header_stamp() {
        let mut engine = forward();
        let out = engine
            .process(Record::new("/odom", Payload::single(t(1000), "odom"), t(1)))
            .expect("process");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].topic, "/odom");
        assert_eq!(out[0].timestamp, t(1000));
        assert_eq!(engine.min_valid_time(), Some(t(1000)));
    }

    #[test]
    fn test_forward_min_valid_time_never_increases() {
        let mut engine = forward();
        for stamp in [500, 300, 800, 300, 100, 900] {
            engine
                .process(Record::new("/odom", Payload::single(t(stamp), "odom"), t(1)))
                .expect("process");
        }
        assert_eq!(engine.min_valid_time(), Some(t(100)));
    }

    #[test]
    fn test_forward_multi_uses_minimum_element() {
        let mut engine = forward();
        let payload = Payload::multi(vec![t(40), t(20), t(30)], false, "markers");
        let out = engine
            .process(Record::new("/markers", payload, t(1)))
            .expect("process");

        assert_eq!(out[0].timestamp, t(20));
    }

    #[test]
    fn test_forward_drops_invalid_single() {
        let mut engine = forward();
        let out = engine
            .process(Record::new("/odom", Payload::single(t(0), "odom"), t(5)))
            .expect("process");

        assert!(out.is_empty());
        assert_eq!(engine.min_valid_time(), None);
        assert_eq!(engine.pending(), 0);
        assert_eq!(engine.stats().dropped, 1);
    }

    #[test]
    fn test_forward_drops_invalid_multi_not_eligible() {
        let mut engine = forward();
        let payload = Payload::multi(vec![t(-1), t(50)], false, "markers");
        let out = engine
            .process(Record::new("/markers", payload, t(5)))
            .expect("process");

        assert!(out.is_empty());
        assert_eq!(engine.pending(), 0);
        assert_eq!(engine.min_valid_time(), None);
    }

    #[test]
    fn test_forward_missing_header_falls_back_and_warns_once() {
        let mut engine = forward();
        for _ in 0..2 {
            let out = engine
                .process(Record::new("/chatter", Payload::unstamped("text"), t(999)))
                .expect("process");
            assert_eq!(out[0].timestamp, t(999));
        }

        assert_eq!(engine.warnings().count(), 1);
        assert!(engine.warnings().has_warned(WarnKind::MissingHeader, "/chatter"));
        assert_eq!(engine.stats().fallback, 2);
    }

    #[test]
    fn test_forward_defers_until_valid_stamp() {
        let mut engine = forward();

        let out = engine
            .process(Record::new("/tf", Payload::multi(vec![t(-5)], true, "tf1"), t(1)))
            .expect("process");
        assert!(out.is_empty());

        // No valid stamp yet: fallback emission does not flush.
        let out = engine
            .process(Record::new("/chatter", Payload::unstamped("text"), t(2)))
            .expect("process");
        assert_eq!(out.len(), 1);
        assert_eq!(engine.pending(), 1);

        let out = engine
            .process(Record::new("/tf", Payload::multi(vec![t(0)], true, "tf2"), t(3)))
            .expect("process");
        assert!(out.is_empty());
        assert_eq!(engine.pending_topics().count(), 2);

        let out = engine
            .process(Record::new("/scan", Payload::single(t(200), "scan"), t(4)))
            .expect("process");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].topic, "/scan");
        assert_eq!(out[0].timestamp, t(200));
        assert_eq!(out[1].timestamp, t(200));
        assert_eq!(out[2].timestamp, t(200));
        assert!(stamps_of(&out[1]).starts_with("tf1:"));
        assert!(stamps_of(&out[2]).starts_with("tf2:"));
        assert_eq!(engine.pending(), 0);

        let stats = engine.stats();
        assert_eq!(stats.deferred, 2);
        assert_eq!(stats.flushed, 2);
        assert_eq!(stats.emitted, 4);
    }

    #[test]
    fn test_flush_keeps_original_header_stamp() {
        let mut engine = forward();
        engine
            .process(Record::new("/tf", Payload::multi(vec![t(-5)], true, "tf"), t(1)))
            .expect("process");
        let out = engine
            .process(Record::new("/scan", Payload::single(t(200), "scan"), t(2)))
            .expect("process");

        let expected = PayloadStamps::Multi {
            elements: vec![t(-5)],
            deferral_eligible: true,
        };
        assert_eq!(stamps_of(&out[1]), format!("tf:{:?}", expected));
    }

    #[test]
    fn test_flush_applies_offset_to_deferred_topic() {
        let mut engine = with_offset("/tf", 7, true, false);
        engine
            .process(Record::new("/tf", Payload::multi(vec![t(-5)], true, "tf"), t(1)))
            .expect("process");
        let out = engine
            .process(Record::new("/scan", Payload::single(t(200), "scan"), t(2)))
            .expect("process");

        assert_eq!(out[0].timestamp, t(200));
        assert_eq!(out[1].timestamp, t(207));
        let expected = PayloadStamps::Multi {
            elements: vec![t(2)],
            deferral_eligible: true,
        };
        assert_eq!(stamps_of(&out[1]), format!("tf:{:?}", expected));
    }

    #[test]
    fn test_offset_without_header() {
        let mut engine = with_offset("/scan", 50, false, false);
        let out = engine
            .process(Record::new("/scan", Payload::single(t(200), "scan"), t(1)))
            .expect("process");

        assert_eq!(out[0].timestamp, t(250));
        assert_eq!(stamps_of(&out[0]), format!("scan:{:?}", PayloadStamps::Single(t(200))));
        assert_eq!(engine.min_valid_time(), Some(t(200)));
    }

    #[test]
    fn test_offset_with_header() {
        let mut engine = with_offset("/scan", 50, true, false);
        let out = engine
            .process(Record::new("/scan", Payload::single(t(200), "scan"), t(1)))
            .expect("process");

        assert_eq!(out[0].timestamp, t(250));
        assert_eq!(stamps_of(&out[0]), format!("scan:{:?}", PayloadStamps::Single(t(250))));
    }

    #[test]
    fn test_invert_writes_bag_timestamp() {
        let mut engine = RestampEngine::new(DebugCodec, OffsetPolicy::default(), true);
        assert!(engine.is_invert());
        let payload = Payload::multi(vec![t(-5), t(10)], true, "tf");
        let out = engine
            .process(Record::new("/tf", payload, t(77)))
            .expect("process");

        assert_eq!(out[0].timestamp, t(77));
        let expected = PayloadStamps::Multi {
            elements: vec![t(77), t(77)],
            deferral_eligible: true,
        };
        assert_eq!(stamps_of(&out[0]), format!("tf:{:?}", expected));
        assert_eq!(engine.pending(), 0);
        assert_eq!(engine.min_valid_time(), None);
    }

    #[test]
    fn test_invert_emits_empty_collection() {
        let mut engine = RestampEngine::new(DebugCodec, OffsetPolicy::default(), true);
        let out = engine
            .process(Record::new("/markers", Payload::multi(vec![], false, "m"), t(12)))
            .expect("process");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp, t(12));
    }

    #[test]
    fn test_invert_then_offset_header() {
        let mut engine = with_offset("/imu", -2, true, true);
        let out = engine
            .process(Record::new("/imu", Payload::single(t(0), "imu"), t(10)))
            .expect("process");

        assert_eq!(out[0].timestamp, t(8));
        assert_eq!(stamps_of(&out[0]), format!("imu:{:?}", PayloadStamps::Single(t(8))));
    }

    #[test]
    fn test_process_serialized_decodes() {
        let mut engine = forward();
        let out = engine
            .process_serialized("/chatter", b"ignored", t(3))
            .expect("process");

        assert_eq!(out[0].timestamp, t(3));
        assert_eq!(stamps_of(&out[0]), "decoded:Unstamped");
    }

    #[test]
    fn test_failed_flush_keeps_deferred_messages() {
        let mut engine = RestampEngine::new(FailingCodec, OffsetPolicy::default(), false);
        for body in ["ok", "bad", "ok2"] {
            let out = engine
                .process(Record::new("/tf", Payload::multi(vec![t(-1)], true, body), t(1)))
                .expect("process");
            assert!(out.is_empty());
        }

        let result = engine.process(Record::new("/scan", Payload::single(t(200), "scan"), t(2)));
        assert!(matches!(
            result,
            Err(RestampError::Codec(CodecError::InvalidStamp { .. }))
        ));

        assert_eq!(engine.pending(), 3);
        assert_eq!(engine.min_valid_time(), None);
        assert!(!engine.warnings().has_warned(WarnKind::AssignedMinValid, "/tf"));

        let stats = engine.stats();
        assert_eq!(stats.records_in, 4);
        assert_eq!(stats.deferred, 3);
        assert_eq!(stats.flushed, 0);
        assert_eq!(stats.emitted, 0);
    }

    #[test]
    fn test_failed_trigger_flushes_on_next_record() {
        let mut engine = RestampEngine::new(FailingCodec, OffsetPolicy::default(), false);
        engine
            .process(Record::new("/tf", Payload::multi(vec![t(0)], true, "tf"), t(1)))
            .expect("process");

        let result = engine.process(Record::new("/scan", Payload::single(t(200), "bad"), t(2)));
        assert!(result.is_err());
        assert_eq!(engine.pending(), 1);
        assert_eq!(engine.min_valid_time(), None);

        let out = engine
            .process(Record::new("/scan", Payload::single(t(300), "scan"), t(3)))
            .expect("process");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, t(300));
        assert_eq!(out[1].topic, "/tf");
        assert_eq!(out[1].timestamp, t(300));
        assert_eq!(out[1].data, b"tf".to_vec());
        assert_eq!(engine.pending(), 0);
        assert_eq!(engine.min_valid_time(), Some(t(300)));

        let stats = engine.stats();
        assert_eq!(stats.flushed, 1);
        assert_eq!(stats.emitted, 2);
    }
}
