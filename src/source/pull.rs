//! Cursor-based polling source.
//!
//! Every tick issues one fetch on a worker thread and the result comes back
//! over a channel that [`PullAdapter::poll`] drains without blocking. At most
//! one fetch is in flight; a tick that finds one pending is skipped.

use super::{AdapterSettings, AdapterState, LogSource, SourceEvent, SourceParams};
use crate::buffer::Tail;
use crate::cancel::CancelToken;
use crate::model::RawLine;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One poll request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    pub target: String,
    /// Cursor returned by the previous successful fetch; 0 means "from the start"
    pub since: i64,
    /// Omitted when the view wants the whole history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail: Option<usize>,
}

/// One poll response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FetchResponse {
    /// Loosely shaped lines, normalized by [`RawLine::from_value`]
    #[serde(default)]
    pub logs: Vec<Value>,
    /// New cursor; absent means unchanged, negative means the origin finished
    #[serde(default)]
    pub since: Option<i64>,
}

impl FetchResponse {
    pub fn new(logs: Vec<Value>, since: Option<i64>) -> Self {
        Self { logs, since }
    }
}

/// The request/response half of the log API.
pub trait LogFetcher: Send + Sync + 'static {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

struct FetchResult {
    generation: u64,
    result: Result<FetchResponse>,
}

pub struct PullAdapter {
    fetcher: Arc<dyn LogFetcher>,
    target: String,
    tail: Tail,
    interval: Duration,
    failure_threshold: u32,
    token: CancelToken,
    state: AdapterState,
    since: i64,
    next_tick: Option<Instant>,
    in_flight: Option<Receiver<FetchResult>>,
    consecutive_failures: u32,
    failure_reported: bool,
}

impl PullAdapter {
    pub fn new(fetcher: Arc<dyn LogFetcher>, params: SourceParams, settings: AdapterSettings) -> Self {
        Self {
            fetcher,
            target: params.target,
            tail: params.tail,
            interval: settings.poll_interval,
            failure_threshold: settings.failure_threshold,
            token: CancelToken::new(params.generation),
            state: AdapterState::Idle,
            since: 0,
            next_tick: None,
            in_flight: None,
            consecutive_failures: 0,
            failure_reported: false,
        }
    }

    /// Cursor the next request will carry.
    pub fn cursor(&self) -> i64 {
        self.since
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    fn request(&self) -> FetchRequest {
        FetchRequest {
            target: self.target.clone(),
            since: self.since,
            tail: self.tail.limit(),
        }
    }

    fn dispatch(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let fetcher = Arc::clone(&self.fetcher);
        let token = self.token.clone();
        let request = self.request();

        debug!(target_name = %request.target, since = request.since, "dispatching log fetch");

        thread::Builder::new()
            .name("tailscope-fetch".to_string())
            .spawn(move || {
                let result = fetcher.fetch(&request);
                if token.is_cancelled() {
                    return;
                }
                let _ = tx.send(FetchResult {
                    generation: token.generation(),
                    result,
                });
            })?;

        self.in_flight = Some(rx);
        Ok(())
    }

    fn collect(&mut self, events: &mut Vec<SourceEvent>) {
        let Some(rx) = &self.in_flight else {
            return;
        };

        let fetched = match rx.try_recv() {
            Ok(fetched) => fetched,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => FetchResult {
                generation: self.token.generation(),
                result: Err(anyhow::anyhow!("fetch worker exited without a response")),
            },
        };
        self.in_flight = None;

        if !self.token.accepts(fetched.generation) {
            debug!(generation = fetched.generation, "discarding stale fetch result");
            return;
        }

        match fetched.result {
            Ok(response) => self.apply(response, events),
            Err(err) => self.record_failure(&err, events),
        }
    }

    fn apply(&mut self, response: FetchResponse, events: &mut Vec<SourceEvent>) {
        self.consecutive_failures = 0;
        self.failure_reported = false;

        if !response.logs.is_empty() {
            let lines = response.logs.iter().map(RawLine::from_value).collect();
            events.push(SourceEvent::Lines(lines));
        }

        match response.since {
            Some(since) if since < 0 => {
                debug!(target_name = %self.target, "log source finished");
                self.state = AdapterState::Ended;
                events.push(SourceEvent::Ended);
            }
            Some(since) if !response.logs.is_empty() => self.since = since,
            _ => {}
        }
    }

    fn record_failure(&mut self, err: &anyhow::Error, events: &mut Vec<SourceEvent>) {
        self.consecutive_failures += 1;
        warn!(
            target_name = %self.target,
            failures = self.consecutive_failures,
            "log fetch failed: {:#}",
            err
        );

        if self.failure_threshold > 0
            && self.consecutive_failures >= self.failure_threshold
            && !self.failure_reported
        {
            self.failure_reported = true;
            events.push(SourceEvent::Lines(vec![RawLine::error(format!(
                "Logs fetch failed {} times: {:#}",
                self.consecutive_failures, err
            ))]));
        }
    }
}

impl LogSource for PullAdapter {
    fn start(&mut self, now: Instant) {
        if self.state != AdapterState::Idle {
            return;
        }
        self.state = AdapterState::Running;
        self.next_tick = Some(now);
    }

    fn poll(&mut self, now: Instant) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        if self.state != AdapterState::Running {
            return events;
        }

        self.collect(&mut events);

        let due = self.next_tick.is_some_and(|tick| now >= tick);
        if self.state == AdapterState::Running && due {
            self.next_tick = Some(now + self.interval);
            if self.in_flight.is_some() {
                debug!(target_name = %self.target, "previous fetch still pending, skipping tick");
            } else if let Err(err) = self.dispatch() {
                self.record_failure(&err, &mut events);
            }
        }

        events
    }

    fn stop(&mut self) {
        if self.state == AdapterState::Stopped {
            return;
        }
        self.token.cancel();
        self.in_flight = None;
        self.next_tick = None;
        self.state = AdapterState::Stopped;
        debug!(target_name = %self.target, generation = self.token.generation(), "pull adapter stopped");
    }

    fn state(&self) -> AdapterState {
        self.state
    }
}

impl Drop for PullAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}
