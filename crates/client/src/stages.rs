//! One method per pipeline stage of the lecture REST API.
//!
//! Each stage is a single HTTP call. Local inputs (files to upload) are
//! checked before the request is built, so a missing file never reaches
//! the network and is reported as a [`StageError::Preflight`].

use std::path::{Path, PathBuf};

use lecturegen_core::config::JobConfig;
use lecturegen_core::error::CoreError;
use lecturegen_core::routes;
use lecturegen_core::status::JobStatus;
use lecturegen_core::types::{ArtifactKind, JobId};
use lecturegen_core::voices::BuiltinVoice;
use lecturegen_core::wire::{
    AckResponse, BuiltinVoicesResponse, CloneVoiceResponse, ClonedVoicesResponse,
    CreateJobResponse, ExtractResponse, GenerateResponse, SlidesTextRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Url};
use tokio::io::AsyncWriteExt;

use crate::transport::{ApiError, Transport};

/// Errors from a single stage call.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Local input missing or unreadable; no request was sent.
    #[error(transparent)]
    Preflight(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A 2xx response that reports `ok: false`.
    #[error("{0}")]
    Rejected(String),

    /// Writing a downloaded artifact to disk failed.
    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stage executor bound to one lecture server.
#[derive(Debug, Clone)]
pub struct LectureClient {
    transport: Transport,
}

impl LectureClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Mint a new job. Call once per operator-initiated run.
    pub async fn create_job(&self) -> Result<JobId, StageError> {
        let request = self.transport.request(Method::POST, routes::JOBS)?;
        let created: CreateJobResponse = self.transport.send_json(routes::JOBS, request).await?;
        tracing::info!(job_id = %created.job_id, "Created lecture job");
        Ok(created.job_id)
    }

    /// Upload one artifact, replacing any earlier upload of the same kind.
    pub async fn upload_artifact(
        &self,
        job_id: &JobId,
        kind: ArtifactKind,
        file: &Path,
    ) -> Result<(), StageError> {
        let data = tokio::fs::read(file).await.map_err(|e| {
            CoreError::Preflight(format!(
                "Cannot read {} {}: {e}",
                kind.noun(),
                file.display()
            ))
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.as_str().to_string());
        let size = data.len();

        let form = Form::new()
            .text("kind", kind.as_str())
            .part("file", Part::bytes(data).file_name(file_name));

        let path = routes::upload(job_id);
        let request = self.transport.request(Method::POST, &path)?.multipart(form);
        let _: AckResponse = self.transport.send_json(&path, request).await?;

        tracing::info!(job_id = %job_id, kind = %kind, bytes = size, "Uploaded artifact");
        Ok(())
    }

    /// Replace the job's configuration wholesale.
    pub async fn set_config(&self, job_id: &JobId, config: &JobConfig) -> Result<(), StageError> {
        let path = routes::config(job_id);
        let request = self
            .transport
            .request(Method::POST, &path)?
            .json(&config.normalized());
        let _: AckResponse = self.transport.send_json(&path, request).await?;
        Ok(())
    }

    /// Read back the job's stored configuration.
    pub async fn job_config(&self, job_id: &JobId) -> Result<JobConfig, StageError> {
        let path = routes::config(job_id);
        let request = self.transport.request(Method::GET, &path)?;
        Ok(self.transport.send_json(&path, request).await?)
    }

    /// Extract editable slide text from the uploaded deck.
    ///
    /// Also serves as the "reload current text" read; calling it again
    /// only re-derives the text.
    pub async fn extract_content(&self, job_id: &JobId) -> Result<String, StageError> {
        let path = routes::extract(job_id);
        let request = self.transport.request(Method::POST, &path)?;
        let extracted: ExtractResponse = self.transport.send_json(&path, request).await?;
        Ok(extracted.slides_text)
    }

    /// Overwrite the job's editable text. Generation consumes the last
    /// text saved here.
    pub async fn set_slide_text(&self, job_id: &JobId, text: &str) -> Result<(), StageError> {
        let path = routes::slides_text(job_id);
        let body = SlidesTextRequest {
            slides_text: text.to_string(),
        };
        let request = self.transport.request(Method::POST, &path)?.json(&body);
        let _: AckResponse = self.transport.send_json(&path, request).await?;
        Ok(())
    }

    /// Build a reusable voice from the job's uploaded voice sample.
    pub async fn clone_voice(&self, job_id: &JobId) -> Result<CloneVoiceResponse, StageError> {
        let path = routes::clone_voice(job_id);
        let request = self
            .transport
            .request(Method::POST, &path)?
            .multipart(Form::new());
        let cloned: CloneVoiceResponse = self.transport.send_json(&path, request).await?;
        if !cloned.ok {
            return Err(StageError::Rejected(
                cloned.error.unwrap_or_else(|| "clone failed".to_string()),
            ));
        }
        tracing::info!(
            job_id = %job_id,
            display_name = cloned.display_name.as_deref().unwrap_or(""),
            "Cloned voice",
        );
        Ok(cloned)
    }

    /// Queue the job for rendering. Returns as soon as the job is queued.
    pub async fn enqueue_generation(&self, job_id: &JobId) -> Result<GenerateResponse, StageError> {
        let path = routes::generate(job_id);
        let request = self.transport.request(Method::POST, &path)?;
        let queued: GenerateResponse = self.transport.send_json(&path, request).await?;
        tracing::info!(
            job_id = %job_id,
            rq_id = queued.rq_id.as_deref().unwrap_or(""),
            "Queued lecture generation",
        );
        Ok(queued)
    }

    /// Builtin voices for a language and gender.
    pub async fn builtin_voices(
        &self,
        language: &str,
        gender: &str,
    ) -> Result<Vec<BuiltinVoice>, StageError> {
        let request = self
            .transport
            .request(Method::GET, routes::BUILTIN_VOICES)?
            .query(&[("lang", language), ("gender", gender)]);
        let catalog: BuiltinVoicesResponse = self
            .transport
            .send_json(routes::BUILTIN_VOICES, request)
            .await?;
        Ok(catalog.voices)
    }

    /// Every voice cloned on the server so far.
    pub async fn cloned_voices(&self) -> Result<Vec<String>, StageError> {
        let request = self.transport.request(Method::GET, routes::CLONED_VOICES)?;
        let catalog: ClonedVoicesResponse = self
            .transport
            .send_json(routes::CLONED_VOICES, request)
            .await?;
        Ok(catalog.voices)
    }

    /// Current status snapshot of a job.
    pub async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, ApiError> {
        let path = routes::status(job_id);
        let request = self.transport.request(Method::GET, &path)?;
        self.transport.send_json(&path, request).await
    }

    /// Stream the finished video to `dest`. Returns the bytes written.
    pub async fn download_result(&self, job_id: &JobId, dest: &Path) -> Result<u64, StageError> {
        let path = routes::result(job_id);
        let request = self.transport.request(Method::GET, &path)?;
        let mut response = self.transport.send_raw(request).await?;

        let output_error = |source| StageError::Output {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::File::create(dest).await.map_err(output_error)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(ApiError::from)? {
            file.write_all(&chunk).await.map_err(output_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(output_error)?;

        tracing::info!(job_id = %job_id, bytes = written, dest = %dest.display(), "Downloaded result");
        Ok(written)
    }

    /// Location for viewing the finished video inline.
    pub fn view_location(&self, job_id: &JobId) -> Result<Url, ApiError> {
        self.transport.url(&routes::media_video(job_id))
    }

    /// Location for downloading the finished video as an attachment.
    pub fn download_location(&self, job_id: &JobId) -> Result<Url, ApiError> {
        self.transport.url(&routes::result(job_id))
    }
}
