//! Refresh cycle state definitions.

use std::fmt;

use serde::Serialize;

/// Phase of the rate refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    /// No cycle is running.
    #[default]
    Idle,
    /// Fetching the feed payload.
    Fetching,
    /// Parsing and re-basing the feed.
    Normalizing,
    /// Writing the new snapshot to the store.
    Persisting,
}

impl RefreshPhase {
    /// Check if a cycle is in progress.
    pub fn is_running(&self) -> bool {
        !matches!(self, RefreshPhase::Idle)
    }
}

impl fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPhase::Idle => write!(f, "idle"),
            RefreshPhase::Fetching => write!(f, "fetching"),
            RefreshPhase::Normalizing => write!(f, "normalizing"),
            RefreshPhase::Persisting => write!(f, "persisting"),
        }
    }
}
