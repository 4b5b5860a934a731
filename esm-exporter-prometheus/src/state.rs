//! Stages of a scrape, used for state-transition logging.

use std::fmt;

/// Stage a scrape is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeState {
    Idle,
    Connecting,
    Fetching,
    Publishing,
    Rendering,
    Resetting,
}

impl ScrapeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeState::Idle => "idle",
            ScrapeState::Connecting => "connecting",
            ScrapeState::Fetching => "fetching",
            ScrapeState::Publishing => "publishing",
            ScrapeState::Rendering => "rendering",
            ScrapeState::Resetting => "resetting",
        }
    }

    /// Log entry into this state.
    pub fn enter(self) {
        tracing::debug!(state = %self, "Scrape state");
    }
}

impl fmt::Display for ScrapeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
