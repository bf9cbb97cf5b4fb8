//! One log view session: the single owner of buffer, search and follow state.
//!
//! The owning event loop calls [`LogSession::tick`] on its own cadence. Each
//! tick drains the active source adapter, appends to the buffer, brings the
//! search matches up to date and decides whether the view should follow. User
//! operations go through the other methods; none of them fail or block.
//!
//! Changing the target or tail size stops the current adapter before anything
//! is reset, then starts a new one under the next generation, so nothing from
//! the previous run can land in the new buffer.

use crate::buffer::{LineBuffer, Snapshot, Tail};
use crate::event::ViewCommand;
use crate::follow::{FollowController, FollowState, DEFAULT_REENGAGE_ROWS};
use crate::search::{SearchIndex, DEFAULT_DEBOUNCE};
use crate::source::{AdapterSettings, LogSource, SourceEvent, SourceKind, SourceParams};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Per-session knobs, usually resolved from [`ViewerConfig`](crate::config::ViewerConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub tail: Tail,
    pub search_debounce: Duration,
    /// Whether new sessions start in follow mode
    pub follow: bool,
    pub follow_reengage_rows: usize,
    pub adapter: AdapterSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tail: Tail::Bounded(1000),
            search_debounce: DEFAULT_DEBOUNCE,
            follow: true,
            follow_reengage_rows: DEFAULT_REENGAGE_ROWS,
            adapter: AdapterSettings::default(),
        }
    }
}

pub struct LogSession {
    target: String,
    kind: SourceKind,
    settings: SessionSettings,
    buffer: LineBuffer,
    search: SearchIndex,
    follow: FollowController,
    adapter: Option<Box<dyn LogSource>>,
    generation: u64,
    ended: bool,
}

impl LogSession {
    /// Create a session. Nothing is fetched until [`start`](Self::start).
    pub fn new(target: impl Into<String>, kind: SourceKind, settings: SessionSettings) -> Self {
        Self {
            target: target.into(),
            kind,
            buffer: LineBuffer::new(settings.tail),
            search: SearchIndex::new(settings.search_debounce),
            follow: FollowController::new(settings.follow, settings.follow_reengage_rows),
            settings,
            adapter: None,
            generation: 0,
            ended: false,
        }
    }

    /// (Re)start the source: stop the current adapter, clear all view state and
    /// open a new adapter run.
    pub fn start(&mut self, now: Instant) -> ViewCommand {
        self.stop();

        self.generation += 1;
        self.buffer.set_tail(self.settings.tail);
        self.buffer.reset();
        self.search = SearchIndex::new(self.settings.search_debounce);
        self.follow = FollowController::new(self.settings.follow, self.settings.follow_reengage_rows);
        self.ended = false;

        let params = SourceParams {
            target: self.target.clone(),
            tail: self.settings.tail,
            generation: self.generation,
        };
        let mut adapter = self.kind.build(params, self.settings.adapter);
        adapter.start(now);
        self.adapter = Some(adapter);

        info!(
            target_name = %self.target,
            source = self.kind.describe(),
            generation = self.generation,
            tail = ?self.settings.tail,
            "log session started"
        );
        ViewCommand::Reset
    }

    /// Detach from the source. Buffered lines stay readable.
    pub fn stop(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.stop();
            debug!(target_name = %self.target, generation = self.generation, "log session stopped");
        }
    }

    /// User-initiated reconnect; same target and tail.
    pub fn restart(&mut self, now: Instant) -> ViewCommand {
        self.start(now)
    }

    /// Point the session at a different app/service/container.
    pub fn set_target(&mut self, target: impl Into<String>, now: Instant) -> Option<ViewCommand> {
        let target = target.into();
        if target == self.target && self.adapter.is_some() {
            return None;
        }
        self.target = target;
        Some(self.start(now))
    }

    /// Change the tail size; zero or negative means unbounded. Restarts the source.
    pub fn set_tail(&mut self, n: i64, now: Instant) -> Option<ViewCommand> {
        let tail = Tail::from_hint(n);
        if tail == self.settings.tail && self.adapter.is_some() {
            return None;
        }
        self.settings.tail = tail;
        Some(self.start(now))
    }

    /// Advance the session. Returns what the view should do, in order.
    pub fn tick(&mut self, now: Instant) -> Vec<ViewCommand> {
        let mut commands = Vec::new();
        let mut appended = 0;

        let events = match self.adapter.as_mut() {
            Some(adapter) => adapter.poll(now),
            None => Vec::new(),
        };

        for event in events {
            match event {
                SourceEvent::Lines(lines) => {
                    let outcome = self.buffer.append(lines);
                    self.search.on_append(self.buffer.snapshot(), outcome);
                    appended += outcome.appended;
                }
                SourceEvent::Ended => {
                    debug!(target_name = %self.target, "log source ended");
                    self.ended = true;
                }
            }
        }

        if let Some(position) = self.search.poll_pending(now, self.buffer.snapshot()) {
            commands.push(ViewCommand::ScrollToCenter(position));
        }

        if self.follow.should_scroll(appended) && !self.search.has_query() {
            commands.push(ViewCommand::ScrollToEnd);
        }

        commands
    }

    /// Update the search query. Non-empty queries apply after the debounce;
    /// an empty one clears the search at once and hands the view back to follow mode.
    pub fn search(&mut self, query: &str, now: Instant) -> Option<ViewCommand> {
        self.search.set_query(query, now);

        if query.is_empty() {
            self.follow.on_search_cleared();
            return self
                .follow
                .is_following()
                .then_some(ViewCommand::ScrollToEnd);
        }

        self.follow.on_search_started();
        self.search
            .poll_pending(now, self.buffer.snapshot())
            .map(ViewCommand::ScrollToCenter)
    }

    /// Apply a still-debouncing query now, e.g. before reporting a final match count.
    pub fn flush_search(&mut self) -> Option<ViewCommand> {
        self.search
            .apply_pending(self.buffer.snapshot())
            .map(ViewCommand::ScrollToCenter)
    }

    pub fn search_next(&mut self) -> Option<ViewCommand> {
        self.search
            .next(self.buffer.snapshot())
            .map(ViewCommand::ScrollToCenter)
    }

    pub fn search_prev(&mut self) -> Option<ViewCommand> {
        self.search
            .prev(self.buffer.snapshot())
            .map(ViewCommand::ScrollToCenter)
    }

    /// Explicit follow toggle.
    pub fn set_follow(&mut self, enabled: bool) -> Option<ViewCommand> {
        self.follow.set_follow(enabled);
        (self.follow.is_following() && !self.search.has_query()).then_some(ViewCommand::ScrollToEnd)
    }

    /// Report a manual scroll; `rows_from_bottom` is how far the viewport is from the last line.
    pub fn on_scroll(&mut self, rows_from_bottom: usize) {
        self.follow.on_scroll(rows_from_bottom);
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        self.buffer.snapshot()
    }

    pub fn search_state(&self) -> &SearchIndex {
        &self.search
    }

    pub fn follow_state(&self) -> FollowState {
        self.follow.state()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn tail(&self) -> Tail {
        self.settings.tail
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an adapter is running and may still produce lines.
    pub fn is_source_active(&self) -> bool {
        self.adapter.as_ref().is_some_and(|adapter| adapter.is_active())
    }

    /// Whether the source reported that it finished or disconnected.
    pub fn has_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        self.stop();
    }
}
