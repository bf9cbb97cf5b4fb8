//! Live push channel source (container and service log streams).

use super::{AdapterState, LogSource, SourceEvent, SourceParams};
use crate::model::RawLine;
use anyhow::Result;
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum number of channel events drained per poll, so one burst cannot
/// starve the render loop
const MAX_EVENTS_PER_POLL: usize = 10_000;

/// Line appended when the channel disconnects
pub const STOPPED_MESSAGE: &str = "Logs stopped.";

/// Events a push channel can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connect,
    Data(Value),
    Disconnect,
    Error(String),
    ConnectError(String),
}

/// What the adapter asks the transport to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub target: String,
    pub tail: Option<usize>,
}

/// An open channel. Events are pulled without blocking.
pub trait PushChannel: Send {
    fn try_next(&mut self) -> Option<PushEvent>;

    /// Detach from the transport. No event may be delivered afterwards.
    fn close(&mut self);
}

/// Opens push channels for a target.
pub trait PushConnector: Send + Sync + 'static {
    fn connect(&self, request: &StreamRequest) -> Result<Box<dyn PushChannel>>;
}

/// [`PushChannel`] backed by an mpsc receiver; the transport owns the sender.
///
/// A channel reports at most one [`PushEvent::Disconnect`], whether the
/// transport sent it or simply dropped the sender.
pub struct ChannelStream {
    receiver: Option<Receiver<PushEvent>>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl ChannelStream {
    pub fn new(receiver: Receiver<PushEvent>) -> Self {
        Self {
            receiver: Some(receiver),
            on_close: None,
        }
    }

    /// Create a connected sender/stream pair.
    pub fn pair() -> (Sender<PushEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }

    /// Run `hook` when the stream is closed, e.g. to tell the transport to hang up.
    pub fn with_close_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }
}

impl PushChannel for ChannelStream {
    fn try_next(&mut self) -> Option<PushEvent> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(PushEvent::Disconnect) => {
                self.receiver = None;
                Some(PushEvent::Disconnect)
            }
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(PushEvent::Disconnect)
            }
        }
    }

    fn close(&mut self) {
        self.receiver = None;
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

pub struct PushAdapter {
    connector: Arc<dyn PushConnector>,
    request: StreamRequest,
    generation: u64,
    channel: Option<Box<dyn PushChannel>>,
    state: AdapterState,
    /// Lines produced outside of `poll` (a failed connect), reported on the next poll
    pending: Vec<RawLine>,
}

impl PushAdapter {
    pub fn new(connector: Arc<dyn PushConnector>, params: SourceParams) -> Self {
        Self {
            connector,
            request: StreamRequest {
                target: params.target,
                tail: params.tail.limit(),
            },
            generation: params.generation,
            channel: None,
            state: AdapterState::Idle,
            pending: Vec::new(),
        }
    }

    fn end(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.state = AdapterState::Ended;
    }
}

impl LogSource for PushAdapter {
    fn start(&mut self, _now: Instant) {
        if self.state != AdapterState::Idle {
            return;
        }
        match self.connector.connect(&self.request) {
            Ok(channel) => {
                debug!(target_name = %self.request.target, generation = self.generation, "push channel opened");
                self.channel = Some(channel);
                self.state = AdapterState::Running;
            }
            Err(err) => {
                warn!(target_name = %self.request.target, "push connect failed: {:#}", err);
                self.pending
                    .push(RawLine::error(format!("Logs connect error: {:#}", err)));
                self.state = AdapterState::Ended;
            }
        }
    }

    fn poll(&mut self, _now: Instant) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        if self.state == AdapterState::Stopped {
            return events;
        }

        let mut lines = std::mem::take(&mut self.pending);
        let mut ended = self.state == AdapterState::Ended && !lines.is_empty();

        if let Some(channel) = self.channel.as_mut() {
            for _ in 0..MAX_EVENTS_PER_POLL {
                let Some(event) = channel.try_next() else {
                    break;
                };
                match event {
                    PushEvent::Connect => {
                        debug!(target_name = %self.request.target, "push channel connected");
                    }
                    PushEvent::Data(value) => lines.push(RawLine::from_value(&value)),
                    PushEvent::Error(message) => {
                        lines.push(RawLine::error(format!("Logs error: {}", message)));
                    }
                    PushEvent::ConnectError(message) => {
                        lines.push(RawLine::error(format!("Logs connect error: {}", message)));
                    }
                    PushEvent::Disconnect => {
                        lines.push(RawLine::error(STOPPED_MESSAGE));
                        ended = true;
                        break;
                    }
                }
            }
        }

        if ended && self.state == AdapterState::Running {
            debug!(target_name = %self.request.target, "push channel disconnected");
            self.end();
        }

        if !lines.is_empty() {
            events.push(SourceEvent::Lines(lines));
        }
        if ended {
            events.push(SourceEvent::Ended);
        }
        events
    }

    fn stop(&mut self) {
        if self.state == AdapterState::Stopped {
            return;
        }
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.pending.clear();
        self.state = AdapterState::Stopped;
        debug!(target_name = %self.request.target, generation = self.generation, "push adapter stopped");
    }

    fn state(&self) -> AdapterState {
        self.state
    }
}

impl Drop for PushAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}
