/// Default distance from the bottom (in rows) that still counts as "at the end"
pub const DEFAULT_REENGAGE_ROWS: usize = 2;

/// Whether the view tracks the newest line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// Scroll to the last line whenever new lines arrive
    Following,
    /// Leave the viewport where the user put it
    Pinned,
}

/// Decides whether an append should scroll the view to the end.
///
/// Search takes over positioning while a query is active: starting a search
/// pins the view, and clearing it restores whatever follow state the user had
/// before the search began. Scroll events during a search are ignored for the
/// same reason.
#[derive(Debug, Clone)]
pub struct FollowController {
    state: FollowState,
    searching: bool,
    resume_after_search: bool,
    reengage_rows: usize,
}

impl FollowController {
    pub fn new(enabled: bool, reengage_rows: usize) -> Self {
        Self {
            state: if enabled {
                FollowState::Following
            } else {
                FollowState::Pinned
            },
            searching: false,
            resume_after_search: false,
            reengage_rows,
        }
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    pub fn is_following(&self) -> bool {
        self.state == FollowState::Following
    }

    /// Explicit toggle from the user.
    ///
    /// During a search this only changes what happens once the search is cleared.
    pub fn set_follow(&mut self, enabled: bool) {
        if self.searching {
            self.resume_after_search = enabled;
            return;
        }
        self.state = if enabled {
            FollowState::Following
        } else {
            FollowState::Pinned
        };
    }

    /// The user scrolled; `rows_from_bottom` is the distance between the last
    /// visible row and the last line.
    pub fn on_scroll(&mut self, rows_from_bottom: usize) {
        if self.searching {
            return;
        }
        self.state = if rows_from_bottom <= self.reengage_rows {
            FollowState::Following
        } else {
            FollowState::Pinned
        };
    }

    pub fn on_search_started(&mut self) {
        if self.searching {
            return;
        }
        self.searching = true;
        self.resume_after_search = self.is_following();
        self.state = FollowState::Pinned;
    }

    pub fn on_search_cleared(&mut self) {
        if !self.searching {
            return;
        }
        self.searching = false;
        if self.resume_after_search {
            self.state = FollowState::Following;
        }
    }

    /// Whether an append of `appended` lines should scroll to the end.
    pub fn should_scroll(&self, appended: usize) -> bool {
        appended > 0 && !self.searching && self.is_following()
    }
}

impl Default for FollowController {
    fn default() -> Self {
        Self::new(true, DEFAULT_REENGAGE_ROWS)
    }
}
