//! Source adapters: turn a push channel or a polled endpoint into a uniform
//! stream of [`SourceEvent`]s for the session to append.

pub mod file;
pub mod pull;
pub mod push;
pub mod stream;

use crate::buffer::Tail;
use crate::model::RawLine;
use pull::{LogFetcher, PullAdapter};
use push::{PushAdapter, PushConnector};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default interval between pull requests
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default number of consecutive pull failures before one is shown inline
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// What an adapter produced since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Lines to append, in arrival order
    Lines(Vec<RawLine>),
    /// The origin will not produce anything more
    Ended,
}

/// Lifecycle of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Idle,
    Running,
    /// Origin finished or disconnected
    Ended,
    /// Stopped by the owner
    Stopped,
}

/// A started-once, stopped-once producer of log lines.
///
/// `stop` must guarantee that no event produced by this adapter run is ever
/// returned afterwards. Adapters also stop on drop.
pub trait LogSource: Send {
    fn start(&mut self, now: Instant);

    /// Collect whatever arrived since the last call. Never blocks.
    fn poll(&mut self, now: Instant) -> Vec<SourceEvent>;

    fn stop(&mut self);

    fn state(&self) -> AdapterState;

    fn is_active(&self) -> bool {
        self.state() == AdapterState::Running
    }
}

/// Identity of one adapter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceParams {
    /// App, service, container or deploy the logs belong to
    pub target: String,
    pub tail: Tail,
    /// Session generation this run belongs to
    pub generation: u64,
}

/// Knobs shared by all adapters of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterSettings {
    pub poll_interval: Duration,
    /// 0 disables surfacing pull failures
    pub failure_threshold: u32,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

/// The origin of a session's lines. A session uses exactly one kind.
#[derive(Clone)]
pub enum SourceKind {
    Pull(Arc<dyn LogFetcher>),
    Push(Arc<dyn PushConnector>),
}

impl SourceKind {
    /// Build a fresh, not yet started adapter for one run.
    pub fn build(&self, params: SourceParams, settings: AdapterSettings) -> Box<dyn LogSource> {
        match self {
            SourceKind::Pull(fetcher) => {
                Box::new(PullAdapter::new(Arc::clone(fetcher), params, settings))
            }
            SourceKind::Push(connector) => Box::new(PushAdapter::new(Arc::clone(connector), params)),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            SourceKind::Pull(_) => "pull",
            SourceKind::Push(_) => "push",
        }
    }
}

impl std::fmt::Debug for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceKind::{}", self.describe())
    }
}
