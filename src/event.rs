/// Instructions for the view that renders a session.
///
/// The session never scrolls anything itself; it reports what the view should
/// do and the view applies it on its own paint cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    /// Make the last line visible (follow mode)
    ScrollToEnd,
    /// Bring the line at this snapshot position into the middle of the viewport
    ScrollToCenter(usize),
    /// The buffer was cleared for a new target or tail size
    Reset,
}
