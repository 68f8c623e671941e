//! Request and response bodies of the lecture REST API.
//!
//! Every response is decoded into one of these schemas at the transport
//! boundary. Optional fields default when absent; a missing required
//! field is a decode error rather than a silently empty value.

use serde::{Deserialize, Serialize};

use crate::types::JobId;
use crate::voices::BuiltinVoice;

/// `POST /api/jobs`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobResponse {
    pub job_id: JobId,
}

/// Plain acknowledgement (`upload`, `config`, `slides-text`). Only the
/// status code matters; the body just has to be a JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {}

/// `POST /api/jobs/{id}/clone-voice`
#[derive(Debug, Clone, Deserialize)]
pub struct CloneVoiceResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Cloned voices known to the server after this clone.
    #[serde(default)]
    pub voices: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /api/jobs/{id}/extract`
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractResponse {
    pub slides_text: String,
    /// Per-slide structured extraction; kept opaque.
    #[serde(default)]
    pub slides_data: Option<serde_json::Value>,
}

/// Body of `POST /api/jobs/{id}/slides-text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidesTextRequest {
    pub slides_text: String,
}

/// `POST /api/jobs/{id}/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub job_id: Option<JobId>,
    /// Identifier of the server's background queue entry.
    #[serde(default)]
    pub rq_id: Option<String>,
}

/// `GET /api/voices/builtin`
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinVoicesResponse {
    #[serde(default)]
    pub voices: Vec<BuiltinVoice>,
}

/// `GET /api/voices/cloned`
#[derive(Debug, Clone, Deserialize)]
pub struct ClonedVoicesResponse {
    #[serde(default)]
    pub voices: Vec<String>,
}
