//! Operator-facing flows composed from stage calls.
//!
//! Three flows mirror the three pages of the lecture tool:
//!
//! * [`intake`] -- create a job, upload the teacher image and the slide
//!   deck, save the voice config, extract slide text, then hand off to the
//!   editor.
//! * [`EditSession`] -- load, edit, save the slide text and start
//!   generation, then hand off to the result page once the job is done.
//! * [`show_result`] -- wait for the job and expose its video locations.
//!
//! Steps run strictly in order and the first failure stops the flow.
//! Completed steps are not rolled back; the server keeps partial progress
//! and the job can be resumed with its id. Every error is reported once
//! to the [`StatusSink`] before it is returned.

use std::path::{Path, PathBuf};

use lecturegen_core::config::JobConfig;
use lecturegen_core::error::CoreError;
use lecturegen_core::status::{JobStatus, StatusUpdate};
use lecturegen_core::types::{ArtifactKind, JobId, Page, JOB_QUERY_PARAM};
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::identity::{resolve_job_id, IdentityError, IdentityStore, ResolveError};
use crate::poller::{watch, PollConfig, PollOutcome};
use crate::sink::StatusSink;
use crate::stages::{LectureClient, StageError};
use crate::transport::{ApiError, Transport};

/// Errors that stop a flow.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Local input missing; raised before the step's request.
    #[error("{0}")]
    Preflight(String),

    /// A stage call failed.
    #[error(transparent)]
    Remote(StageError),

    /// Neither an explicit nor a stored job id is available.
    #[error(transparent)]
    MissingJobId(CoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The status query failed while polling.
    #[error(transparent)]
    StatusQuery(ApiError),

    /// The job reached the `failed` state.
    #[error("{0}")]
    JobFailed(String),

    #[error("Status polling cancelled")]
    Cancelled,
}

impl FlowError {
    /// Errors the poller has already put on the status surface.
    fn reported_by_poller(&self) -> bool {
        matches!(
            self,
            Self::StatusQuery(_) | Self::JobFailed(_) | Self::Cancelled
        )
    }
}

impl From<StageError> for FlowError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Preflight(core) => Self::Preflight(core.to_string()),
            other => Self::Remote(other),
        }
    }
}

impl From<ResolveError> for FlowError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Missing(core) => Self::MissingJobId(core),
            ResolveError::Store(e) => Self::Identity(e),
        }
    }
}

/// Turn a watch result into the flow's view of it.
fn terminal(outcome: PollOutcome) -> Result<JobStatus, FlowError> {
    match outcome {
        PollOutcome::Done(status) => Ok(status),
        PollOutcome::Failed(status) => Err(FlowError::JobFailed(status.failure_message())),
        PollOutcome::Transport(e) => Err(FlowError::StatusQuery(e)),
        PollOutcome::Cancelled => Err(FlowError::Cancelled),
    }
}

/// Flow boundary: put the error on the status surface, then return it.
fn report<T>(sink: &dyn StatusSink, result: Result<T, FlowError>) -> Result<T, FlowError> {
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Flow stopped");
        if !e.reported_by_poller() {
            sink.emit(StatusUpdate::Error(e.to_string()));
        }
    }
    result
}

fn not_selected(kind: ArtifactKind) -> FlowError {
    FlowError::Preflight(format!("No {} selected", kind.noun()))
}

/// Pre-flight check that a selected file exists before any request for
/// it is issued.
async fn require_file(path: Option<&Path>, kind: ArtifactKind) -> Result<&Path, FlowError> {
    let path = path.ok_or_else(|| not_selected(kind))?;
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(_) => Err(FlowError::Preflight(format!(
            "Selected {} is not a file: {}",
            kind.noun(),
            path.display()
        ))),
        Err(e) => Err(FlowError::Preflight(format!(
            "Cannot read {} {}: {e}",
            kind.noun(),
            path.display()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Hand-off to another page, carrying the job id as `?job=<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub page: Page,
    pub job_id: JobId,
}

impl Navigation {
    pub fn location(&self, transport: &Transport) -> Result<Url, ApiError> {
        let mut url = transport.url(self.page.path())?;
        url.query_pairs_mut()
            .append_pair(JOB_QUERY_PARAM, self.job_id.as_str());
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// Intake flow
// ---------------------------------------------------------------------------

/// Operator selections for a new job.
#[derive(Debug, Clone, Default)]
pub struct IntakeRequest {
    pub source_image: Option<PathBuf>,
    pub slide_deck: Option<PathBuf>,
    pub config: JobConfig,
}

/// Create a job from the operator's selections and hand off to the editor.
///
/// A missing image stops the flow before any request. A missing deck
/// stops it after the image upload, leaving a resumable job behind.
pub async fn intake(
    client: &LectureClient,
    store: &dyn IdentityStore,
    sink: &dyn StatusSink,
    request: &IntakeRequest,
) -> Result<Navigation, FlowError> {
    let result = run_intake(client, store, sink, request).await;
    report(sink, result)
}

async fn run_intake(
    client: &LectureClient,
    store: &dyn IdentityStore,
    sink: &dyn StatusSink,
    request: &IntakeRequest,
) -> Result<Navigation, FlowError> {
    let image = require_file(request.source_image.as_deref(), ArtifactKind::SourceImage).await?;

    sink.emit(StatusUpdate::Info("Creating job...".into()));
    let job_id = client.create_job().await?;
    store.save(&job_id)?;

    sink.emit(StatusUpdate::Info("Uploading image...".into()));
    client
        .upload_artifact(&job_id, ArtifactKind::SourceImage, image)
        .await?;

    let deck = require_file(request.slide_deck.as_deref(), ArtifactKind::Pptx).await?;
    sink.emit(StatusUpdate::Info("Uploading slide deck...".into()));
    client.upload_artifact(&job_id, ArtifactKind::Pptx, deck).await?;

    sink.emit(StatusUpdate::Info("Saving configuration...".into()));
    client.set_config(&job_id, &request.config).await?;

    sink.emit(StatusUpdate::Info("Extracting slides...".into()));
    client.extract_content(&job_id).await?;

    sink.emit(StatusUpdate::Success("Slides extracted".into()));
    Ok(Navigation {
        page: Page::Editor,
        job_id,
    })
}

/// Result of a successful voice clone.
#[derive(Debug, Clone)]
pub struct ClonedVoice {
    /// Job the voice sample was uploaded to.
    pub job_id: JobId,
    pub display_name: Option<String>,
    /// Cloned voice catalog refreshed after the clone.
    pub voices: Vec<String>,
}

/// Upload a voice sample and turn it into a reusable cloned voice.
///
/// Uses `job_id` when given, otherwise creates (and stores) a new job to
/// hold the sample.
pub async fn clone_voice(
    client: &LectureClient,
    store: &dyn IdentityStore,
    sink: &dyn StatusSink,
    job_id: Option<JobId>,
    sample: Option<&Path>,
) -> Result<ClonedVoice, FlowError> {
    let result = run_clone_voice(client, store, sink, job_id, sample).await;
    report(sink, result)
}

async fn run_clone_voice(
    client: &LectureClient,
    store: &dyn IdentityStore,
    sink: &dyn StatusSink,
    job_id: Option<JobId>,
    sample: Option<&Path>,
) -> Result<ClonedVoice, FlowError> {
    let sample = require_file(sample, ArtifactKind::VoiceSample).await?;

    let job_id = match job_id {
        Some(id) => id,
        None => {
            let id = client.create_job().await?;
            store.save(&id)?;
            id
        }
    };

    sink.emit(StatusUpdate::Info("Uploading voice sample...".into()));
    client
        .upload_artifact(&job_id, ArtifactKind::VoiceSample, sample)
        .await?;

    sink.emit(StatusUpdate::Info("Cloning voice...".into()));
    let cloned = client.clone_voice(&job_id).await?;
    let voices = client.cloned_voices().await?;

    let name = cloned.display_name.clone().unwrap_or_default();
    sink.emit(StatusUpdate::Success(format!("Cloned voice: {name}")));

    Ok(ClonedVoice {
        job_id,
        display_name: cloned.display_name,
        voices,
    })
}

// ---------------------------------------------------------------------------
// Edit / generate flow
// ---------------------------------------------------------------------------

/// Editing session over one job's slide text.
pub struct EditSession<'a> {
    client: &'a LectureClient,
    sink: &'a dyn StatusSink,
    job_id: JobId,
    text: String,
}

impl<'a> EditSession<'a> {
    /// Enter the editor: resolve the job id, remember it, and load the
    /// current slide text.
    ///
    /// An explicit id wins over the stored one. Without either, the
    /// missing id is reported and no request is made.
    pub async fn open(
        client: &'a LectureClient,
        store: &dyn IdentityStore,
        sink: &'a dyn StatusSink,
        explicit_job: Option<&str>,
    ) -> Result<EditSession<'a>, FlowError> {
        let resolved = resolve_job_id(explicit_job, store)
            .map_err(FlowError::from)
            .and_then(|id| {
                store.save(&id)?;
                Ok(id)
            });
        let job_id = report(sink, resolved)?;

        let mut session = Self {
            client,
            sink,
            job_id,
            text: String::new(),
        };
        session.reload().await?;
        Ok(session)
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Text as last loaded or saved.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Re-read the slide text through the extract endpoint.
    pub async fn reload(&mut self) -> Result<&str, FlowError> {
        self.sink
            .emit(StatusUpdate::Info("Loading slide text...".into()));
        let loaded = self
            .client
            .extract_content(&self.job_id)
            .await
            .map_err(FlowError::from);
        self.text = report(self.sink, loaded)?;
        self.sink
            .emit(StatusUpdate::Success("Slide text loaded".into()));
        Ok(&self.text)
    }

    /// Stored voice/render configuration of the job.
    pub async fn config(&self) -> Result<JobConfig, FlowError> {
        let config = self
            .client
            .job_config(&self.job_id)
            .await
            .map_err(FlowError::from);
        report(self.sink, config)
    }

    /// Persist edited text.
    pub async fn save(&mut self, text: &str) -> Result<(), FlowError> {
        self.sink.emit(StatusUpdate::Info("Saving...".into()));
        let saved = self
            .client
            .set_slide_text(&self.job_id, text)
            .await
            .map_err(FlowError::from);
        report(self.sink, saved)?;
        self.text = text.to_string();
        self.sink.emit(StatusUpdate::Success("Saved".into()));
        Ok(())
    }

    /// Persist `text`, queue generation, and poll until the job ends.
    ///
    /// On `done`, returns the hand-off to the result page.
    pub async fn generate(
        &mut self,
        text: &str,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Navigation, FlowError> {
        let result = self.run_generate(text, poll, cancel).await;
        report(self.sink, result)
    }

    async fn run_generate(
        &mut self,
        text: &str,
        poll: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Navigation, FlowError> {
        self.sink
            .emit(StatusUpdate::Info("Queueing generation...".into()));
        self.client.set_slide_text(&self.job_id, text).await?;
        self.text = text.to_string();

        let queued = self.client.enqueue_generation(&self.job_id).await?;
        let queued_id = queued.job_id.as_ref().unwrap_or(&self.job_id);
        self.sink.emit(StatusUpdate::Info(format!(
            "Generation started ({queued_id}). Processing..."
        )));

        let outcome = watch(self.client, &self.job_id, poll, self.sink, cancel).await;
        terminal(outcome)?;

        self.sink
            .emit(StatusUpdate::Info("Opening result page...".into()));
        Ok(Navigation {
            page: Page::Result,
            job_id: self.job_id.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Result flow
// ---------------------------------------------------------------------------

/// Where a finished lecture can be watched and downloaded.
#[derive(Debug, Clone)]
pub struct ResultLocations {
    pub job_id: JobId,
    /// Inline, streamable view.
    pub view: Url,
    /// Attachment download.
    pub download: Url,
    pub status: JobStatus,
}

/// Wait for a job to finish and expose its video locations.
///
/// Starts polling immediately; no intake or edit step runs first.
pub async fn show_result(
    client: &LectureClient,
    store: &dyn IdentityStore,
    sink: &dyn StatusSink,
    explicit_job: Option<&str>,
    poll: &PollConfig,
    cancel: &CancellationToken,
) -> Result<ResultLocations, FlowError> {
    let result = run_show_result(client, store, sink, explicit_job, poll, cancel).await;
    report(sink, result)
}

async fn run_show_result(
    client: &LectureClient,
    store: &dyn IdentityStore,
    sink: &dyn StatusSink,
    explicit_job: Option<&str>,
    poll: &PollConfig,
    cancel: &CancellationToken,
) -> Result<ResultLocations, FlowError> {
    let job_id = resolve_job_id(explicit_job, store)?;

    let outcome = watch(client, &job_id, poll, sink, cancel).await;
    let status = terminal(outcome)?;

    let view = client
        .view_location(&job_id)
        .map_err(|e| FlowError::Remote(e.into()))?;
    let download = client
        .download_location(&job_id)
        .map_err(|e| FlowError::Remote(e.into()))?;

    Ok(ResultLocations {
        job_id,
        view,
        download,
        status,
    })
}
