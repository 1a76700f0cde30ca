// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Once-per-topic warnings.

use std::collections::HashSet;

/// Kinds of per-topic warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarnKind {
    /// Message has no embedded stamp; bag timestamp kept.
    MissingHeader,
    /// Message buffered until a valid stamp is seen.
    Deferred,
    /// Buffered message assigned the minimum valid stamp.
    AssignedMinValid,
}

/// Registry of warnings already emitted during one run.
#[derive(Debug, Clone, Default)]
pub struct WarnOnce {
    seen: HashSet<(WarnKind, String)>,
}

impl WarnOnce {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` unless a warning of this kind was already logged for
    /// `topic`. Returns whether the warning was logged.
    pub fn warn(&mut self, kind: WarnKind, topic: &str, message: impl FnOnce() -> String) -> bool {
        if self.seen.contains(&(kind, topic.to_string())) {
            return false;
        }
        self.seen.insert((kind, topic.to_string()));
        tracing::warn!("{}", message());
        true
    }

    /// Number of distinct warnings logged.
    pub fn count(&self) -> usize {
        self.seen.len()
    }

    /// Whether a warning of `kind` was logged for `topic`.
    pub fn has_warned(&self, kind: WarnKind, topic: &str) -> bool {
        self.seen.contains(&(kind, topic.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warns_once_per_topic() {
        let mut warnings = WarnOnce::new();

        assert!(warnings.warn(WarnKind::MissingHeader, "/chatter", || "first".into()));
        assert!(!warnings.warn(WarnKind::MissingHeader, "/chatter", || "second".into()));
        assert!(warnings.warn(WarnKind::MissingHeader, "/other", || "third".into()));
        assert_eq!(warnings.count(), 2);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut warnings = WarnOnce::new();

        assert!(warnings.warn(WarnKind::Deferred, "/tf", || "delaying".into()));
        assert!(warnings.warn(WarnKind::AssignedMinValid, "/tf", || "assigning".into()));
        assert!(warnings.has_warned(WarnKind::Deferred, "/tf"));
        assert!(!warnings.has_warned(WarnKind::MissingHeader, "/tf"));
    }

    #[test]
    fn test_message_not_built_when_suppressed() {
        let mut warnings = WarnOnce::new();
        warnings.warn(WarnKind::MissingHeader, "/chatter", || "first".into());

        let mut built = false;
        warnings.warn(WarnKind::MissingHeader, "/chatter", || {
            built = true;
            String::new()
        });
        assert!(!built);
    }
}
