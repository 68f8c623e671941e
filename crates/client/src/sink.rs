//! Status surface fed by flows and the poller.
//!
//! The client only produces [`StatusUpdate`] values; how they are shown
//! is up to the sink.

use lecturegen_core::status::StatusUpdate;
use tokio::sync::mpsc::UnboundedSender;

/// Receiver of operator-facing status messages.
pub trait StatusSink: Send + Sync {
    fn emit(&self, update: StatusUpdate);
}

impl StatusSink for UnboundedSender<StatusUpdate> {
    fn emit(&self, update: StatusUpdate) {
        // A dropped receiver means nobody is watching; the flow carries on.
        let _ = self.send(update);
    }
}

/// Sink that records every update through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn emit(&self, update: StatusUpdate) {
        match &update {
            StatusUpdate::Error(message) => tracing::warn!(status = %message, "Job status"),
            StatusUpdate::Info(message) | StatusUpdate::Success(message) => {
                tracing::info!(status = %message, "Job status")
            }
        }
    }
}
