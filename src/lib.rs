// Library interface for tailscope
// The binary drives a LogSession; other front ends embed it the same way

pub mod ansi;
pub mod buffer;
pub mod cancel;
pub mod config;
pub mod event;
pub mod follow;
pub mod model;
pub mod search;
pub mod session;
pub mod source;

#[cfg(test)]
mod test_utils;

pub use buffer::{LineBuffer, Snapshot, Tail};
pub use event::ViewCommand;
pub use follow::FollowState;
pub use model::{LogLevel, LogLine, RawLine};
pub use search::SearchIndex;
pub use session::{LogSession, SessionSettings};
pub use source::SourceKind;
