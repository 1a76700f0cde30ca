// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Nanosecond time values and offsets.
//!
//! All times live on a single signed 64-bit nanosecond axis. Embedded header
//! stamps recorded before a clock synchronised may be zero or negative, which
//! is why the axis is signed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A point in time, in nanoseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeValue(i64);

/// A signed additive offset, in nanoseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeOffset(i64);

impl TimeValue {
    /// Create a time value from nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Create a time value from a `sec` / `nanosec` stamp pair.
    pub fn from_stamp(sec: i64, nanosec: i64) -> Self {
        Self(sec.saturating_mul(NANOS_PER_SEC).saturating_add(nanosec))
    }

    /// Nanoseconds since the epoch.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Split into a `sec` / `nanosec` pair with `nanosec` in `[0, 1e9)`.
    pub fn to_stamp(self) -> (i64, u32) {
        // rem_euclid keeps nanosec non-negative for times before the epoch
        (
            self.0.div_euclid(NANOS_PER_SEC),
            self.0.rem_euclid(NANOS_PER_SEC) as u32,
        )
    }

    /// Whether this time is usable as a reference (strictly positive).
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl TimeOffset {
    /// Zero offset.
    pub const ZERO: Self = Self(0);

    /// Create an offset from nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Offset in nanoseconds.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }
}

impl Add<TimeOffset> for TimeValue {
    type Output = TimeValue;

    fn add(self, rhs: TimeOffset) -> TimeValue {
        TimeValue(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<TimeOffset> for TimeValue {
    fn add_assign(&mut self, rhs: TimeOffset) {
        *self = *self + rhs;
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
