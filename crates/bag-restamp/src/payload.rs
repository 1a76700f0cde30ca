// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded payloads and access to their embedded header stamps.
//!
//! A payload is split into the stamps it carries and an opaque body owned by
//! the codec. The stamp layout is resolved once when the payload is decoded:
//!
//! | Shape | Example message | Stamps |
//! |-------|-----------------|--------|
//! | single | `sensor_msgs/msg/Imu` | `header.stamp` |
//! | multi | `tf2_msgs/msg/TFMessage` | `transforms[*].header.stamp` |
//! | unstamped | `std_msgs/msg/String` | none |

use crate::time::{TimeOffset, TimeValue};

/// Structural classification of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// One embedded header stamp.
    SingleStamped,
    /// An ordered collection of elements, each with its own stamp.
    MultiStamped {
        /// Invalid stamps are buffered until a valid reference time is seen,
        /// instead of dropping the message.
        deferral_eligible: bool,
    },
    /// No embedded stamp at all.
    Unstamped,
}

/// Embedded stamps of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadStamps {
    /// Single header stamp.
    Single(TimeValue),
    /// One stamp per element, in element order.
    Multi {
        elements: Vec<TimeValue>,
        deferral_eligible: bool,
    },
    /// Nothing to read or write.
    Unstamped,
}

impl PayloadStamps {
    /// Classify the stamp layout.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Single(_) => PayloadKind::SingleStamped,
            Self::Multi {
                deferral_eligible, ..
            } => PayloadKind::MultiStamped {
                deferral_eligible: *deferral_eligible,
            },
            Self::Unstamped => PayloadKind::Unstamped,
        }
    }

    /// Earliest embedded time, if any.
    ///
    /// An empty element collection has no time, same as an unstamped payload.
    pub fn min_time(&self) -> Option<TimeValue> {
        match self {
            Self::Single(t) => Some(*t),
            Self::Multi { elements, .. } => elements.iter().copied().min(),
            Self::Unstamped => None,
        }
    }

    /// Overwrite every present stamp with `t`.
    pub fn write_time(&mut self, t: TimeValue) {
        match self {
            Self::Single(stamp) => *stamp = t,
            Self::Multi { elements, .. } => elements.iter_mut().for_each(|stamp| *stamp = t),
            Self::Unstamped => {}
        }
    }

    /// Shift every present stamp by `offset`.
    pub fn add_offset(&mut self, offset: TimeOffset) {
        match self {
            Self::Single(stamp) => *stamp += offset,
            Self::Multi { elements, .. } => elements.iter_mut().for_each(|stamp| *stamp += offset),
            Self::Unstamped => {}
        }
    }
}

/// A decoded message payload.
///
/// `B` is the codec's representation of everything that is not a stamp. The
/// restamp logic never looks inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload<B> {
    /// Embedded stamps.
    pub stamps: PayloadStamps,
    /// Codec-owned remainder of the message.
    pub body: B,
}

impl<B> Payload<B> {
    /// Create a payload with a single header stamp.
    pub fn single(stamp: TimeValue, body: B) -> Self {
        Self {
            stamps: PayloadStamps::Single(stamp),
            body,
        }
    }

    /// Create a payload with one stamp per element.
    pub fn multi(elements: Vec<TimeValue>, deferral_eligible: bool, body: B) -> Self {
        Self {
            stamps: PayloadStamps::Multi {
                elements,
                deferral_eligible,
            },
            body,
        }
    }

    /// Create a payload without stamps.
    pub fn unstamped(body: B) -> Self {
        Self {
            stamps: PayloadStamps::Unstamped,
            body,
        }
    }

    /// Classify the payload.
    pub fn kind(&self) -> PayloadKind {
        self.stamps.kind()
    }

    /// Earliest embedded time, if any.
    pub fn min_time(&self) -> Option<TimeValue> {
        self.stamps.min_time()
    }

    /// Overwrite every embedded stamp with `t`.
    pub fn write_time(&mut self, t: TimeValue) {
        self.stamps.write_time(t);
    }

    /// Shift every embedded stamp by `offset`.
    pub fn add_offset(&mut self, offset: TimeOffset) {
        self.stamps.add_offset(offset);
    }

    /// Whether an invalid stamp on this payload should be buffered.
    pub fn is_deferral_eligible(&self) -> bool {
        matches!(
            self.kind(),
            PayloadKind::MultiStamped {
                deferral_eligible: true
            }
        )
    }
}
