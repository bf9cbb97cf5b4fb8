use crate::model::{LogLine, RawLine};
use std::collections::VecDeque;
use std::time::SystemTime;
use tracing::trace;

/// Upper bound on the initial allocation; the deque grows as lines arrive
const INITIAL_CAPACITY: usize = 1000;

/// Retention bound for a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tail {
    /// Keep every line
    #[default]
    Unbounded,
    /// Keep only the most recent N lines
    Bounded(usize),
}

impl Tail {
    /// Interpret a user-supplied tail size. Zero and negative values mean "everything".
    pub fn from_hint(n: i64) -> Self {
        if n > 0 {
            Tail::Bounded(usize::try_from(n).unwrap_or(usize::MAX))
        } else {
            Tail::Unbounded
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Tail::Unbounded => None,
            Tail::Bounded(n) => Some(*n),
        }
    }
}

/// Result of a single [`LineBuffer::append`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    /// Lines added by this call
    pub appended: usize,
    /// Lines dropped from the front to honour the tail bound
    pub trimmed: usize,
}

impl AppendOutcome {
    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }
}

/// Ordered, optionally tail-bounded collection of log lines.
///
/// Lines are kept in a deque (newest at the back) so trimming the front is O(1).
/// Sequence numbers are assigned here and are gapless: because trimming only
/// ever removes a prefix, the retained lines always cover the contiguous range
/// `first_sequence .. next_sequence`.
#[derive(Debug)]
pub struct LineBuffer {
    lines: VecDeque<LogLine>,
    next_sequence: u64,
    tail: Tail,
}

impl LineBuffer {
    pub fn new(tail: Tail) -> Self {
        let initial = tail.limit().unwrap_or(INITIAL_CAPACITY).min(INITIAL_CAPACITY);
        Self {
            lines: VecDeque::with_capacity(initial),
            next_sequence: 0,
            tail,
        }
    }

    pub fn tail(&self) -> Tail {
        self.tail
    }

    /// Change the retention bound. Takes effect on the next append.
    pub fn set_tail(&mut self, tail: Tail) {
        self.tail = tail;
    }

    /// Append lines in order, stamping sequence numbers, then trim to the tail bound.
    pub fn append(&mut self, lines: Vec<RawLine>) -> AppendOutcome {
        if lines.is_empty() {
            return AppendOutcome::default();
        }

        let received_at = SystemTime::now();
        let appended = lines.len();
        for raw in lines {
            let line = LogLine::from_raw(self.next_sequence, raw, received_at);
            self.next_sequence += 1;
            self.lines.push_back(line);
        }

        let trimmed = self.trim();
        if trimmed > 0 {
            trace!(trimmed, retained = self.lines.len(), "trimmed log buffer");
        }

        AppendOutcome { appended, trimmed }
    }

    fn trim(&mut self) -> usize {
        let Some(limit) = self.tail.limit() else {
            return 0;
        };
        let excess = self.lines.len().saturating_sub(limit);
        self.lines.drain(..excess);
        excess
    }

    /// Drop every line and restart sequence numbering at 0.
    pub fn reset(&mut self) {
        self.lines.clear();
        self.next_sequence = 0;
    }

    /// Borrowed read-only view of the current lines.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot { lines: &self.lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sequence number the next appended line will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(Tail::Unbounded)
    }
}

/// Read-only view over a [`LineBuffer`], addressed by position.
///
/// Creating one is O(1); it borrows the buffer, so it can never observe a
/// half-applied append or trim.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    lines: &'a VecDeque<LogLine>,
}

impl<'a> Snapshot<'a> {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&'a LogLine> {
        self.lines.get(position)
    }

    pub fn last(&self) -> Option<&'a LogLine> {
        self.lines.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a LogLine> + 'a {
        self.lines.iter()
    }

    /// Iterate from `start` with positions attached. Skipped lines are not visited.
    pub fn iter_from(&self, start: usize) -> impl Iterator<Item = (usize, &'a LogLine)> + 'a {
        let start = start.min(self.lines.len());
        (start..).zip(self.lines.range(start..))
    }

    pub fn first_sequence(&self) -> Option<u64> {
        self.lines.front().map(|line| line.sequence)
    }

    /// Position of the line with the given sequence, if it is still retained.
    pub fn position_of(&self, sequence: u64) -> Option<usize> {
        let first = self.first_sequence()?;
        let position = usize::try_from(sequence.checked_sub(first)?).ok()?;
        (position < self.lines.len()).then_some(position)
    }
}
