use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Regex matching ANSI escape sequences:
/// - CSI sequences: ESC [ ... (params) final_byte  (colors, cursor movement, etc.)
/// - OSC sequences: ESC ] ... ST  (hyperlinks, window titles, etc.)
/// - Character set designators: ESC ( B, ESC ) 0, etc.
/// - Simple two-byte escapes: ESC =, ESC >, ESC M, etc.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\x1b\[[0-9;?]*[ -/]*[@-~]",
        r"|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)",
        r"|\x1b[()][A-Z0-9]",
        r"|\x1b[^\[\]()0-9]",
    ))
    .expect("ANSI regex must compile")
});

/// Strip all ANSI escape sequences from a string.
///
/// Borrows the input untouched when it contains no ESC byte, which is the
/// common case for container output.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    ANSI_RE.replace_all(s, "")
}

/// Normalized form of a line used for case-insensitive matching.
///
/// Escape codes are invisible to the operator, so they must not be able to
/// produce (or break) a match.
pub fn search_key(text: &str) -> String {
    strip_ansi(text).to_uppercase()
}

/// Normalized form of a search query. Kept next to [`search_key`] so both
/// sides of the comparison always use the same folding.
pub fn normalize_query(query: &str) -> String {
    query.to_uppercase()
}
