//! Test doubles for the transport seams.

use crate::source::pull::{FetchRequest, FetchResponse, LogFetcher};
use crate::source::push::{ChannelStream, PushChannel, PushConnector, PushEvent, StreamRequest};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Poll `cond` until it holds or two seconds pass. Returns the final result.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// Fetcher that replays queued responses and records every request.
/// Once the script runs out it answers with an empty page.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<FetchResponse, String>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, logs: Vec<Value>, since: Option<i64>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(FetchResponse::new(logs, since)));
    }

    pub fn push_err(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LogFetcher for ScriptedFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(FetchResponse::default()),
        }
    }
}

/// Fetcher whose requests hang until released, for in-flight and cancellation
/// tests. Each response carries one line naming the request's tail hint, so a
/// test can tell which adapter run produced it.
pub struct GatedFetcher {
    gate_tx: Mutex<Sender<()>>,
    gate_rx: Mutex<Receiver<()>>,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl GatedFetcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            gate_tx: Mutex::new(tx),
            gate_rx: Mutex::new(rx),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Let `n` pending or future requests complete.
    pub fn release(&self, n: usize) {
        let tx = self.gate_tx.lock().unwrap();
        for _ in 0..n {
            tx.send(()).unwrap();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn line_for(tail: Option<usize>) -> String {
        format!("tail={:?}", tail)
    }
}

impl LogFetcher for GatedFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate_rx.lock().unwrap().recv();
        self.completed.fetch_add(1, Ordering::SeqCst);
        gate.map_err(|_| anyhow!("gate closed"))?;
        Ok(FetchResponse::new(
            vec![json!(Self::line_for(request.tail))],
            Some(request.since + 1),
        ))
    }
}

/// Connector handing out channels prepared by the test, in order.
/// Connecting with nothing prepared fails like an unreachable server.
#[derive(Default)]
pub struct ScriptedConnector {
    prepared: Mutex<VecDeque<ChannelStream>>,
    requests: Mutex<Vec<StreamRequest>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a channel for the next `connect` and return its sending side.
    pub fn prepare(&self) -> Sender<PushEvent> {
        let (tx, stream) = ChannelStream::pair();
        self.prepared.lock().unwrap().push_back(stream);
        tx
    }

    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PushConnector for ScriptedConnector {
    fn connect(&self, request: &StreamRequest) -> Result<Box<dyn PushChannel>> {
        self.requests.lock().unwrap().push(request.clone());
        let stream = self
            .prepared
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("websocket error"))?;
        Ok(Box::new(stream))
    }
}
