//! Case-insensitive substring search over the line buffer.
//!
//! Matches are stored as snapshot positions (not sequences) because the view
//! addresses rows positionally when scrolling. Positions go stale whenever the
//! buffer trims its front, so a trim always forces a full recompute from a
//! fresh snapshot; plain appends only need the new lines scanned.

use crate::ansi::normalize_query;
use crate::buffer::{AppendOutcome, Snapshot};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default delay between the last keystroke and recomputing matches
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Positions of every line in `snapshot`, starting at `start`, whose search key
/// contains `normalized`.
pub fn find_matches(snapshot: Snapshot<'_>, normalized: &str, start: usize) -> Vec<usize> {
    snapshot
        .iter_from(start)
        .filter(|(_, line)| line.matches(normalized))
        .map(|(position, _)| position)
        .collect()
}

#[derive(Debug, Clone)]
struct PendingQuery {
    query: String,
    due: Instant,
}

/// Query, matches and current-match cursor for one view session.
#[derive(Debug)]
pub struct SearchIndex {
    debounce: Duration,
    /// Query as typed, including one still waiting out the debounce
    typed: String,
    pending: Option<PendingQuery>,
    /// Query the current matches were computed for
    applied: String,
    normalized: String,
    matches: Vec<usize>,
    cursor: Option<usize>,
    /// Sequence of the line under the cursor, used to keep the cursor in place
    /// across recomputes
    anchor: Option<u64>,
}

impl SearchIndex {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            typed: String::new(),
            pending: None,
            applied: String::new(),
            normalized: String::new(),
            matches: Vec::new(),
            cursor: None,
            anchor: None,
        }
    }

    /// Record a new query.
    ///
    /// An empty query clears everything immediately; anything else is applied
    /// by [`poll_pending`](Self::poll_pending) once the debounce has elapsed.
    pub fn set_query(&mut self, query: &str, now: Instant) {
        self.typed = query.to_string();

        if query.is_empty() {
            self.clear();
            return;
        }

        if query == self.applied {
            self.pending = None;
            return;
        }

        self.pending = Some(PendingQuery {
            query: query.to_string(),
            due: now + self.debounce,
        });
    }

    /// Apply a pending query whose debounce has elapsed.
    ///
    /// Returns the position of the first match when the new query matched anything.
    pub fn poll_pending(&mut self, now: Instant, snapshot: Snapshot<'_>) -> Option<usize> {
        let due = self.pending.as_ref().is_some_and(|p| now >= p.due);
        if !due {
            return None;
        }
        self.apply_pending(snapshot)
    }

    /// Apply a pending query right away, without waiting out the debounce.
    pub fn apply_pending(&mut self, snapshot: Snapshot<'_>) -> Option<usize> {
        let pending = self.pending.take()?;

        self.applied = pending.query;
        self.normalized = normalize_query(&self.applied);
        self.matches = find_matches(snapshot, &self.normalized, 0);
        self.cursor = (!self.matches.is_empty()).then_some(0);
        self.update_anchor(snapshot);

        debug!(
            query = %self.applied,
            matches = self.matches.len(),
            lines = snapshot.len(),
            "search applied"
        );

        self.current()
    }

    /// Keep matches consistent with a buffer that just grew (and maybe trimmed).
    pub fn on_append(&mut self, snapshot: Snapshot<'_>, outcome: AppendOutcome) {
        if self.applied.is_empty() || outcome.is_empty() {
            return;
        }

        if outcome.trimmed > 0 {
            self.recompute(snapshot);
            return;
        }

        let start = snapshot.len().saturating_sub(outcome.appended);
        let fresh = find_matches(snapshot, &self.normalized, start);
        if !fresh.is_empty() {
            self.matches.extend(fresh);
            if self.cursor.is_none() {
                self.cursor = Some(0);
                self.update_anchor(snapshot);
            }
        }
    }

    /// Recompute every match from scratch.
    ///
    /// The cursor stays on the same line when that line still matches,
    /// otherwise it moves to the first match.
    pub fn recompute(&mut self, snapshot: Snapshot<'_>) {
        if self.applied.is_empty() {
            return;
        }

        self.matches = find_matches(snapshot, &self.normalized, 0);
        let kept = self
            .anchor
            .and_then(|sequence| snapshot.position_of(sequence))
            .and_then(|position| self.matches.binary_search(&position).ok());

        self.cursor = match kept {
            Some(index) => Some(index),
            None if self.matches.is_empty() => None,
            None => Some(0),
        };
        self.update_anchor(snapshot);
    }

    /// Advance to the next match, wrapping to the first.
    pub fn next(&mut self, snapshot: Snapshot<'_>) -> Option<usize> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let next = match self.cursor {
            Some(c) if c + 1 < len => c + 1,
            _ => 0,
        };
        self.cursor = Some(next);
        self.update_anchor(snapshot);
        self.current()
    }

    /// Step back to the previous match, wrapping to the last.
    pub fn prev(&mut self, snapshot: Snapshot<'_>) -> Option<usize> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let prev = match self.cursor {
            Some(c) if c > 0 && c < len => c - 1,
            _ => len - 1,
        };
        self.cursor = Some(prev);
        self.update_anchor(snapshot);
        self.current()
    }

    fn update_anchor(&mut self, snapshot: Snapshot<'_>) {
        self.anchor = self
            .current()
            .and_then(|position| snapshot.get(position))
            .map(|line| line.sequence);
    }

    /// Drop query, matches and cursor.
    pub fn clear(&mut self) {
        self.typed.clear();
        self.pending = None;
        self.applied.clear();
        self.normalized.clear();
        self.matches.clear();
        self.cursor = None;
        self.anchor = None;
    }

    /// Whether the user has a non-empty query, applied or still debouncing.
    pub fn has_query(&self) -> bool {
        !self.typed.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Query as typed by the user.
    pub fn query(&self) -> &str {
        &self.typed
    }

    /// Query the current matches belong to.
    pub fn applied_query(&self) -> &str {
        &self.applied
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Snapshot position of the current match.
    pub fn current(&self) -> Option<usize> {
        self.cursor.and_then(|c| self.matches.get(c).copied())
    }

    /// Whether the line at `position` is the highlighted match.
    pub fn is_current(&self, position: usize) -> bool {
        self.current() == Some(position)
    }

    /// Counter shown next to the search box, e.g. `3 / 12`.
    pub fn label(&self) -> String {
        let total = self.matches.len();
        let shown = self.cursor.map_or(0, |c| (c + 1).min(total));
        format!("{} / {}", shown, total)
    }
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
