//! Push source over a byte stream (stdin, pipes, process substitution).

use super::file::parse_line;
use super::push::{ChannelStream, PushChannel, PushConnector, PushEvent, StreamRequest};
use crate::cancel::CancelToken;
use anyhow::{anyhow, Result};
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::thread;
use tracing::debug;

/// Connector that turns a readable stream into a push channel.
///
/// A stream can only be consumed once, so only the first `connect` succeeds;
/// later attempts (a restart) report a connect error line instead.
pub struct ReaderConnector {
    reader: Mutex<Option<Box<dyn Read + Send>>>,
}

impl ReaderConnector {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Mutex::new(Some(Box::new(reader))),
        }
    }

    pub fn stdin() -> Self {
        Self::new(std::io::stdin())
    }
}

impl PushConnector for ReaderConnector {
    fn connect(&self, request: &StreamRequest) -> Result<Box<dyn PushChannel>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| anyhow!("stream reader lock poisoned"))?
            .take()
            .ok_or_else(|| anyhow!("{} was already consumed", request.target))?;

        let (tx, stream) = ChannelStream::pair();
        let token = CancelToken::default();
        spawn_stream_reader(reader, tx, token.clone());

        Ok(Box::new(stream.with_close_hook(move || token.cancel())))
    }
}

/// Read lines on a background thread until EOF, an error, or cancellation.
fn spawn_stream_reader(reader: Box<dyn Read + Send>, tx: Sender<PushEvent>, token: CancelToken) {
    thread::spawn(move || {
        let _ = tx.send(PushEvent::Connect);
        let buf_reader = BufReader::new(reader);

        for line in buf_reader.lines() {
            if token.is_cancelled() {
                return;
            }
            let event = match line {
                Ok(line) => PushEvent::Data(parse_line(&line)),
                Err(e) => {
                    let _ = tx.send(PushEvent::Error(e.to_string()));
                    break;
                }
            };
            if tx.send(event).is_err() {
                // Receiver dropped, stop reading
                return;
            }
        }

        debug!("stream reader reached end of input");
        let _ = tx.send(PushEvent::Disconnect);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::wait_until;
    use serde_json::json;
    use std::io::Cursor;

    fn request() -> StreamRequest {
        StreamRequest {
            target: "<stdin>".to_string(),
            tail: None,
        }
    }

    #[test]
    fn test_streams_lines_then_disconnects() {
        let connector = ReaderConnector::new(Cursor::new("first\n{\"level\":\"warn\",\"text\":\"second\"}\n"));
        let mut channel = connector.connect(&request()).unwrap();

        let mut events = Vec::new();
        assert!(wait_until(|| {
            while let Some(event) = channel.try_next() {
                events.push(event);
            }
            events.last() == Some(&PushEvent::Disconnect)
        }));

        assert_eq!(
            events,
            vec![
                PushEvent::Connect,
                PushEvent::Data(json!("first")),
                PushEvent::Data(json!({"level": "warn", "text": "second"})),
                PushEvent::Disconnect,
            ]
        );
    }

    #[test]
    fn test_second_connect_fails() {
        let connector = ReaderConnector::new(Cursor::new(""));
        assert!(connector.connect(&request()).is_ok());
        let err = connector.connect(&request()).err().unwrap();
        assert!(err.to_string().contains("already consumed"));
    }
}
