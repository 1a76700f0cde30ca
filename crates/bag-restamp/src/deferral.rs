// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Holding area for messages whose header stamp is not valid yet.
//!
//! Transform messages captured before the clock synchronised carry stamps
//! `<= 0`. They are kept here, in arrival order, until a valid stamp shows up
//! later in the stream and can be assigned to them.

use crate::payload::Payload;
use crate::time::TimeValue;

/// A buffered message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredEntry<B> {
    /// Topic name.
    pub topic: String,

    /// Decoded payload, stamps untouched.
    pub payload: Payload<B>,

    /// Embedded time that caused the deferral.
    pub original_timestamp: TimeValue,
}

/// FIFO buffer of deferred messages.
#[derive(Debug, Clone)]
pub struct DeferralBuffer<B> {
    entries: Vec<DeferredEntry<B>>,
}

impl<B> Default for DeferralBuffer<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<B> DeferralBuffer<B> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, topic: impl Into<String>, payload: Payload<B>, original: TimeValue) {
        self.entries.push(DeferredEntry {
            topic: topic.into(),
            payload,
            original_timestamp: original,
        });
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over buffered entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DeferredEntry<B>> {
        self.entries.iter()
    }
}
