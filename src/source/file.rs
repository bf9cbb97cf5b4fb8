//! Pull source over a local log file.
//!
//! The cursor is the byte offset just past the last complete line handed out,
//! so every request reads only what was appended since. A file that shrinks
//! below the cursor was truncated or rotated and is read again from the start.

use super::pull::{FetchRequest, FetchResponse, LogFetcher};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Interpret one line of a log file. JSON lines keep their level and time.
pub fn parse_line(line: &str) -> Value {
    let trimmed = line.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    Value::String(line.to_string())
}

impl LogFetcher for FileFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open: {}", self.path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("Failed to get metadata: {}", self.path.display()))?
            .len();

        let mut offset = u64::try_from(request.since).unwrap_or(0);
        if offset > len {
            offset = 0;
        }
        if offset == len {
            return Ok(FetchResponse::new(Vec::new(), Some(request.since)));
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = Vec::with_capacity((len - offset) as usize);
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read: {}", self.path.display()))?;

        // Keep a partially written last line for the next request
        let Some(end) = bytes.iter().rposition(|&b| b == b'\n') else {
            return Ok(FetchResponse::new(Vec::new(), Some(request.since)));
        };
        let complete = &bytes[..=end];
        let text = String::from_utf8_lossy(complete);

        let mut lines: Vec<&str> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        // split() leaves an empty piece after the final newline
        lines.pop();

        if offset == 0 {
            if let Some(tail) = request.tail {
                let skip = lines.len().saturating_sub(tail);
                lines.drain(..skip);
            }
        }

        let logs = lines.into_iter().map(parse_line).collect();
        let next = offset + complete.len() as u64;
        Ok(FetchResponse::new(logs, Some(next as i64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn request(since: i64, tail: Option<usize>) -> FetchRequest {
        FetchRequest {
            target: "file".to_string(),
            since,
            tail,
        }
    }

    fn texts(response: &FetchResponse) -> Vec<String> {
        response
            .logs
            .iter()
            .map(|v| crate::model::RawLine::from_value(v).text)
            .collect()
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("plain"), json!("plain"));
        assert_eq!(
            parse_line(r#"{"level":"error","text":"x"}"#),
            json!({"level": "error", "text": "x"})
        );
        assert_eq!(parse_line("{not json"), json!("{not json"));
    }

    #[test]
    fn test_reads_whole_file_then_increments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "one").unwrap();
        writeln!(file, "two").unwrap();
        file.flush().unwrap();

        let fetcher = FileFetcher::new(file.path());
        let first = fetcher.fetch(&request(0, None)).unwrap();
        assert_eq!(texts(&first), vec!["one", "two"]);
        let since = first.since.unwrap();
        assert_eq!(since, 8);

        let idle = fetcher.fetch(&request(since, None)).unwrap();
        assert!(idle.logs.is_empty());
        assert_eq!(idle.since, Some(since));

        writeln!(file, "three").unwrap();
        file.flush().unwrap();
        let next = fetcher.fetch(&request(since, None)).unwrap();
        assert_eq!(texts(&next), vec!["three"]);
    }

    #[test]
    fn test_tail_limits_first_read_only() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..10 {
            writeln!(file, "line {}", i).unwrap();
        }
        file.flush().unwrap();

        let fetcher = FileFetcher::new(file.path());
        let first = fetcher.fetch(&request(0, Some(3))).unwrap();
        assert_eq!(texts(&first), vec!["line 7", "line 8", "line 9"]);

        for i in 10..15 {
            writeln!(file, "line {}", i).unwrap();
        }
        file.flush().unwrap();
        let next = fetcher.fetch(&request(first.since.unwrap(), Some(3))).unwrap();
        assert_eq!(next.logs.len(), 5);
    }

    #[test]
    fn test_partial_line_waits() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "done\nhalf").unwrap();
        file.flush().unwrap();

        let fetcher = FileFetcher::new(file.path());
        let first = fetcher.fetch(&request(0, None)).unwrap();
        assert_eq!(texts(&first), vec!["done"]);

        writeln!(file, " line").unwrap();
        file.flush().unwrap();
        let next = fetcher.fetch(&request(first.since.unwrap(), None)).unwrap();
        assert_eq!(texts(&next), vec!["half line"]);
    }

    #[test]
    fn test_truncated_file_restarts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a long line that will vanish").unwrap();
        file.flush().unwrap();

        let fetcher = FileFetcher::new(file.path());
        let first = fetcher.fetch(&request(0, None)).unwrap();

        file.as_file().set_len(0).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        writeln!(file, "fresh").unwrap();
        file.flush().unwrap();

        let next = fetcher.fetch(&request(first.since.unwrap(), None)).unwrap();
        assert_eq!(texts(&next), vec!["fresh"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let fetcher = FileFetcher::new("/path/that/does/not/exist.log");
        let err = fetcher.fetch(&request(0, None)).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
