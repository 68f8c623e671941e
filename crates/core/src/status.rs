//! Job status schema and the pure state machine behind polling.
//!
//! `GET /api/jobs/{id}/status` returns a [`JobStatus`]. The poller feeds
//! each observation through [`WatchState::next`], which performs no I/O,
//! so the decision logic is tested without a network.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generic message used when a failed job carries no message.
pub const FAILED_FALLBACK: &str = "failed";

/// Generic message used when a finished job carries no message.
pub const DONE_FALLBACK: &str = "Done";

/// Server-side lifecycle state of a job.
///
/// Moves forward only: `queued -> processing -> done | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted but not picked up by a worker. The server reports a
    /// freshly created job as `created`.
    #[serde(alias = "created")]
    Queued,
    /// A worker is rendering the lecture. Reported as `running` by the
    /// generation worker.
    #[serde(alias = "running")]
    Processing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Snapshot of a job's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub current: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    /// Server-side location of the rendered video, set once `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            message: None,
            current: None,
            total: None,
            video_path: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_progress(mut self, current: u64, total: u64) -> Self {
        self.current = Some(current);
        self.total = Some(total);
        self
    }

    fn message_text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// Best available description of a non-terminal job.
    pub fn progress_message(&self) -> String {
        match self.message_text() {
            Some(message) => message.to_string(),
            None => format!(
                "Processing {}/{}",
                self.current.unwrap_or(0),
                self.total.unwrap_or(0)
            ),
        }
    }

    pub fn done_message(&self) -> String {
        self.message_text().unwrap_or(DONE_FALLBACK).to_string()
    }

    pub fn failure_message(&self) -> String {
        format!("Failed: {}", self.message_text().unwrap_or(FAILED_FALLBACK))
    }
}

// ---------------------------------------------------------------------------
// Watcher state machine
// ---------------------------------------------------------------------------

/// State of one status watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Polling,
    Done,
    Failed,
}

impl WatchState {
    /// Transition on an observed status. `Done` and `Failed` are absorbing.
    pub fn next(self, observed: &JobStatus) -> WatchState {
        match self {
            WatchState::Done | WatchState::Failed => self,
            WatchState::Polling => match observed.state {
                JobState::Done => WatchState::Done,
                JobState::Failed => WatchState::Failed,
                JobState::Queued | JobState::Processing => WatchState::Polling,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WatchState::Polling)
    }
}

// ---------------------------------------------------------------------------
// Operator-facing status values
// ---------------------------------------------------------------------------

/// One message for the operator's status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Info(String),
    Success(String),
    Error(String),
}

impl StatusUpdate {
    pub fn message(&self) -> &str {
        match self {
            Self::Info(m) | Self::Success(m) | Self::Error(m) => m,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(m) => write!(f, "{m}"),
            Self::Success(m) => write!(f, "✅ {m}"),
            Self::Error(m) => write!(f, "❌ {m}"),
        }
    }
}
