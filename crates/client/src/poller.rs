//! Fixed-interval status polling until a job reaches a terminal state.
//!
//! [`watch`] queries the job status, feeds it through
//! [`WatchState::next`], reports the best available message, and sleeps
//! for [`PollConfig::interval`] before the next query. Queries never
//! overlap: the next one is only issued after the previous response has
//! been handled. There is no retry limit and no overall timeout; the loop
//! ends on `done`, on `failed`, on a transport error, or when the
//! [`CancellationToken`] fires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lecturegen_core::status::{JobStatus, StatusUpdate, WatchState};
use lecturegen_core::types::JobId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sink::StatusSink;
use crate::stages::LectureClient;
use crate::transport::ApiError;

/// Delay between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Tunable parameters for the status watcher.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Anything that can report a job's status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError>;
}

#[async_trait]
impl StatusSource for LectureClient {
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError> {
        LectureClient::job_status(self, job_id).await
    }
}

/// How a watch ended.
#[derive(Debug)]
pub enum PollOutcome {
    Done(JobStatus),
    Failed(JobStatus),
    /// The status query itself failed. Polling stops on the first one.
    Transport(ApiError),
    Cancelled,
}

/// Poll `job_id` until it reaches a terminal state.
pub async fn watch<S>(
    source: &S,
    job_id: &JobId,
    config: &PollConfig,
    sink: &dyn StatusSink,
    cancel: &CancellationToken,
) -> PollOutcome
where
    S: StatusSource + ?Sized,
{
    let mut state = WatchState::Polling;
    let mut tick = 0u64;

    loop {
        tick += 1;

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, tick, "Status watch cancelled");
                return PollOutcome::Cancelled;
            }
            result = source.job_status(job_id) => match result {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(job_id = %job_id, tick, error = %e, "Status query failed");
                    sink.emit(StatusUpdate::Error(e.to_string()));
                    return PollOutcome::Transport(e);
                }
            }
        };

        state = state.next(&status);
        tracing::debug!(job_id = %job_id, tick, state = ?status.state, "Observed job status");

        match state {
            WatchState::Done => {
                tracing::info!(job_id = %job_id, tick, "Job finished");
                sink.emit(StatusUpdate::Success(status.done_message()));
                return PollOutcome::Done(status);
            }
            WatchState::Failed => {
                tracing::warn!(
                    job_id = %job_id,
                    tick,
                    message = status.message.as_deref().unwrap_or(""),
                    "Job failed",
                );
                sink.emit(StatusUpdate::Error(status.failure_message()));
                return PollOutcome::Failed(status);
            }
            WatchState::Polling => {
                sink.emit(StatusUpdate::Info(status.progress_message()));
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, tick, "Status watch cancelled");
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

/// A status watch running on its own task.
pub struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
}

impl WatchHandle {
    /// Start watching `job_id` in the background.
    pub fn spawn<S>(
        source: Arc<S>,
        job_id: JobId,
        config: PollConfig,
        sink: Arc<dyn StatusSink>,
    ) -> Self
    where
        S: StatusSource + 'static,
    {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            watch(source.as_ref(), &job_id, &config, sink.as_ref(), &task_cancel).await
        });
        Self { cancel, task }
    }

    /// Stop polling. The task ends with [`PollOutcome::Cancelled`] unless it
    /// already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the watch to end.
    pub async fn join(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => PollOutcome::Cancelled,
        }
    }
}
