//! Config types for tailscope.
//!
//! `RawConfig` mirrors the YAML file; every field is optional so a global and a
//! project file can be layered. `ViewerConfig` is the resolved result.

use crate::buffer::Tail;
use crate::follow::DEFAULT_REENGAGE_ROWS;
use crate::search::DEFAULT_DEBOUNCE;
use crate::session::SessionSettings;
use crate::source::{AdapterSettings, DEFAULT_FAILURE_THRESHOLD, DEFAULT_POLL_INTERVAL};
use serde::Deserialize;
use std::time::Duration;

/// Default number of lines a view keeps
pub const DEFAULT_TAIL: i64 = 1000;

/// Keys accepted in a config file, used for typo suggestions.
pub const KNOWN_KEYS: &[&str] = &[
    "tail",
    "poll_interval_ms",
    "search_debounce_ms",
    "follow",
    "follow_reengage_rows",
    "fetch_failure_threshold",
];

/// Raw config file structure. Unknown fields are rejected with an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Lines to keep; zero or negative keeps everything.
    pub tail: Option<i64>,
    pub poll_interval_ms: Option<u64>,
    pub search_debounce_ms: Option<u64>,
    /// Start new views in follow mode.
    pub follow: Option<bool>,
    /// Rows from the bottom that still count as "at the end" when scrolling.
    pub follow_reengage_rows: Option<usize>,
    /// Consecutive pull failures before one is shown inline (0 = never).
    pub fetch_failure_threshold: Option<u32>,
}

impl RawConfig {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: RawConfig) -> RawConfig {
        RawConfig {
            tail: other.tail.or(self.tail),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            search_debounce_ms: other.search_debounce_ms.or(self.search_debounce_ms),
            follow: other.follow.or(self.follow),
            follow_reengage_rows: other.follow_reengage_rows.or(self.follow_reengage_rows),
            fetch_failure_threshold: other
                .fetch_failure_threshold
                .or(self.fetch_failure_threshold),
        }
    }
}

/// Resolved viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub tail: i64,
    pub poll_interval: Duration,
    pub search_debounce: Duration,
    pub follow: bool,
    pub follow_reengage_rows: usize,
    pub fetch_failure_threshold: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tail: DEFAULT_TAIL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            search_debounce: DEFAULT_DEBOUNCE,
            follow: true,
            follow_reengage_rows: DEFAULT_REENGAGE_ROWS,
            fetch_failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl From<RawConfig> for ViewerConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = ViewerConfig::default();
        Self {
            tail: raw.tail.unwrap_or(defaults.tail),
            poll_interval: raw
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            search_debounce: raw
                .search_debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.search_debounce),
            follow: raw.follow.unwrap_or(defaults.follow),
            follow_reengage_rows: raw
                .follow_reengage_rows
                .unwrap_or(defaults.follow_reengage_rows),
            fetch_failure_threshold: raw
                .fetch_failure_threshold
                .unwrap_or(defaults.fetch_failure_threshold),
        }
    }
}

impl ViewerConfig {
    /// Settings for a new log session.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            tail: Tail::from_hint(self.tail),
            search_debounce: self.search_debounce,
            follow: self.follow,
            follow_reengage_rows: self.follow_reengage_rows,
            adapter: AdapterSettings {
                poll_interval: self.poll_interval,
                failure_threshold: self.fetch_failure_threshold,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::from(RawConfig::default());
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.tail, 1000);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert!(config.follow);
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let global = RawConfig {
            tail: Some(200),
            follow: Some(false),
            ..Default::default()
        };
        let project = RawConfig {
            tail: Some(50),
            poll_interval_ms: Some(250),
            ..Default::default()
        };

        let merged = global.merge(project);
        assert_eq!(merged.tail, Some(50));
        assert_eq!(merged.follow, Some(false));
        assert_eq!(merged.poll_interval_ms, Some(250));
    }

    #[test]
    fn test_session_settings_translate_tail() {
        let config = ViewerConfig {
            tail: 0,
            ..Default::default()
        };
        assert_eq!(config.session_settings().tail, Tail::Unbounded);

        let config = ViewerConfig {
            tail: 25,
            ..Default::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.tail, Tail::Bounded(25));
        assert_eq!(settings.adapter.failure_threshold, 3);
    }
}
