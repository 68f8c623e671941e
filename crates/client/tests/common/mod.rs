//! In-process mock of the lecture REST API.
//!
//! Binds to `127.0.0.1:0`, keeps every job in memory, and records each
//! request as a short label (`create`, `upload:pptx`, `extract`, ...) so
//! tests can assert exactly which calls a flow issued.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lecturegen_client::poller::PollConfig;
use lecturegen_client::stages::LectureClient;
use lecturegen_client::transport::Transport;
use lecturegen_core::types::JobId;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

/// Bytes served as the rendered lecture video.
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42lecture-video";

/// Text returned by `extract` before any text was saved.
pub const EXTRACTED_TEXT: &str = "Slide 1: Introduction\n\nSlide 2: Summary";

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Server-side view of one job.
#[derive(Debug, Clone, Default)]
pub struct MockJob {
    pub artifacts: HashMap<String, Upload>,
    pub config: Option<Value>,
    pub slides_text: Option<String>,
    /// Status bodies served in order; the last one repeats.
    pub statuses: VecDeque<Value>,
    pub generate_calls: usize,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub jobs: HashMap<String, MockJob>,
    pub requests: Vec<String>,
    pub cloned_voices: Vec<String>,
    /// Forced error responses keyed by request label.
    pub failures: HashMap<String, (StatusCode, Value)>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct MockServer {
    pub base_url: Url,
    state: Shared,
}

impl MockServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server crashed");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("mock server url"),
            state,
        }
    }

    pub fn transport(&self) -> Transport {
        Transport::new(self.base_url.clone(), Duration::from_secs(5)).expect("build transport")
    }

    pub fn client(&self) -> LectureClient {
        LectureClient::new(self.transport())
    }

    /// Request labels received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    pub fn job(&self, id: &JobId) -> MockJob {
        lock(&self.state)
            .jobs
            .get(id.as_str())
            .cloned()
            .unwrap_or_else(|| panic!("no mock job {id}"))
    }

    pub fn job_count(&self) -> usize {
        lock(&self.state).jobs.len()
    }

    /// Register a job directly, bypassing `POST /api/jobs`.
    pub fn insert_job(&self, id: &str, job: MockJob) -> JobId {
        lock(&self.state).jobs.insert(id.to_string(), job);
        JobId::parse(id).expect("valid job id")
    }

    pub fn script_statuses(&self, id: &JobId, statuses: Vec<Value>) {
        let mut state = lock(&self.state);
        let job = state.jobs.entry(id.as_str().to_string()).or_default();
        job.statuses = statuses.into();
    }

    /// Make every request with `label` answer `status` with `body`.
    pub fn fail(&self, label: &str, status: StatusCode, body: Value) {
        lock(&self.state)
            .failures
            .insert(label.to_string(), (status, body));
    }
}

/// Poll settings fast enough for tests against a real socket.
pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
    }
}

/// Write `bytes` to a named file inside `dir`.
pub fn fixture(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/{id}/upload", post(upload))
        .route("/api/jobs/{id}/clone-voice", post(clone_voice))
        .route("/api/jobs/{id}/config", post(set_config).get(get_config))
        .route("/api/jobs/{id}/extract", post(extract))
        .route("/api/jobs/{id}/slides-text", post(set_slides_text))
        .route("/api/jobs/{id}/generate", post(generate))
        .route("/api/jobs/{id}/status", get(status))
        .route("/api/jobs/{id}/result", get(result))
        .route("/media/jobs/{id}/video", get(media_video))
        .route("/api/voices/builtin", get(builtin_voices))
        .route("/api/voices/cloned", get(cloned_voices))
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": message }))).into_response()
}

/// Record the request and return the forced failure for it, if any.
fn enter(state: &mut MockState, label: &str) -> Option<Response> {
    state.requests.push(label.to_string());
    state
        .failures
        .get(label)
        .map(|(status, body)| (*status, Json(body.clone())).into_response())
}

fn unknown_job() -> Response {
    error(StatusCode::NOT_FOUND, "Unknown job")
}

async fn create_job(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "create") {
        return forced;
    }
    let id = uuid::Uuid::new_v4().to_string();
    let job = MockJob {
        statuses: VecDeque::from([json!({ "state": "created" })]),
        ..MockJob::default()
    };
    state.jobs.insert(id.clone(), job);
    Json(json!({ "job_id": id })).into_response()
}

async fn upload(
    State(state): State<Shared>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut kind = None;
    let mut file = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("kind") => kind = field.text().await.ok(),
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                if let Ok(bytes) = field.bytes().await {
                    file = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let mut state = lock(&state);
    let label = format!("upload:{}", kind.as_deref().unwrap_or("?"));
    if let Some(forced) = enter(&mut state, &label) {
        return forced;
    }
    let Some(job) = state.jobs.get_mut(&id) else {
        return unknown_job();
    };
    let (Some(kind), Some(file)) = (kind, file) else {
        return error(StatusCode::BAD_REQUEST, "Missing kind or file");
    };
    if !matches!(kind.as_str(), "source_image" | "pptx" | "voice_sample") {
        return error(StatusCode::BAD_REQUEST, "Unknown kind");
    }
    job.artifacts.insert(kind, file);
    Json(json!({ "ok": true })).into_response()
}

async fn clone_voice(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "clone-voice") {
        return forced;
    }
    let Some(job) = state.jobs.get(&id) else {
        return unknown_job();
    };
    if !job.artifacts.contains_key("voice_sample") {
        return error(StatusCode::BAD_REQUEST, "Missing voice sample. Upload first.");
    }
    let display_name = format!("voice_{}", &id[..id.len().min(8)]);
    state.cloned_voices.push(display_name.clone());
    Json(json!({
        "ok": true,
        "display_name": display_name,
        "voices": state.cloned_voices,
    }))
    .into_response()
}

async fn set_config(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "config") {
        return forced;
    }
    let Some(job) = state.jobs.get_mut(&id) else {
        return unknown_job();
    };
    job.config = Some(body);
    Json(json!({ "ok": true })).into_response()
}

async fn get_config(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "get-config") {
        return forced;
    }
    let Some(job) = state.jobs.get(&id) else {
        return unknown_job();
    };
    Json(job.config.clone().unwrap_or_else(|| json!({}))).into_response()
}

async fn extract(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "extract") {
        return forced;
    }
    let Some(job) = state.jobs.get_mut(&id) else {
        return unknown_job();
    };
    if !job.artifacts.contains_key("pptx") {
        return error(StatusCode::BAD_REQUEST, "Missing PPTX. Upload first.");
    }
    let text = job
        .slides_text
        .get_or_insert_with(|| EXTRACTED_TEXT.to_string())
        .clone();
    Json(json!({
        "ok": true,
        "slides_text": text,
        "slides_data": [{ "index": 1 }, { "index": 2 }],
    }))
    .into_response()
}

#[derive(Deserialize)]
struct SlidesTextBody {
    slides_text: String,
}

async fn set_slides_text(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<SlidesTextBody>,
) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "slides-text") {
        return forced;
    }
    let Some(job) = state.jobs.get_mut(&id) else {
        return unknown_job();
    };
    job.slides_text = Some(body.slides_text);
    Json(json!({ "ok": true })).into_response()
}

async fn generate(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "generate") {
        return forced;
    }
    let Some(job) = state.jobs.get_mut(&id) else {
        return unknown_job();
    };
    job.generate_calls += 1;
    Json(json!({ "ok": true, "job_id": id, "rq_id": format!("rq-{id}") })).into_response()
}

async fn status(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "status") {
        return forced;
    }
    let Some(job) = state.jobs.get_mut(&id) else {
        return unknown_job();
    };
    let body = if job.statuses.len() > 1 {
        job.statuses.pop_front()
    } else {
        job.statuses.front().cloned()
    };
    Json(body.unwrap_or_else(|| json!({ "state": "queued" }))).into_response()
}

fn video(state: &Shared, id: &str, label: &str, disposition: &str) -> Response {
    let mut state = lock(state);
    if let Some(forced) = enter(&mut state, label) {
        return forced;
    }
    let Some(job) = state.jobs.get(id) else {
        return unknown_job();
    };
    let done = job
        .statuses
        .front()
        .and_then(|s| s.get("state"))
        .and_then(Value::as_str)
        == Some("done");
    if !done {
        return error(StatusCode::NOT_FOUND, "Video not ready");
    }
    (
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"lecture_{id}.mp4\""),
            ),
        ],
        VIDEO_BYTES,
    )
        .into_response()
}

async fn result(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    video(&state, &id, "result", "attachment")
}

async fn media_video(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    video(&state, &id, "media-video", "inline")
}

#[derive(Deserialize)]
struct VoiceQuery {
    lang: Option<String>,
    gender: Option<String>,
}

async fn builtin_voices(State(state): State<Shared>, Query(q): Query<VoiceQuery>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "voices-builtin") {
        return forced;
    }
    let lang = q.lang.unwrap_or_else(|| "vi".into());
    let gender = q.gender.unwrap_or_else(|| "Nữ".into());
    let voices = match (lang.as_str(), gender.as_str()) {
        ("vi", "Nữ") => json!([
            { "id": "vi-VN-HoaiMyNeural", "name": "Hoài My" },
            { "id": "vi-VN-Standard-A" },
        ]),
        ("en", "Nam") => json!([{ "id": "en-US-GuyNeural", "name": "Guy" }]),
        _ => json!([]),
    };
    Json(json!({ "voices": voices })).into_response()
}

async fn cloned_voices(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    if let Some(forced) = enter(&mut state, "voices-cloned") {
        return forced;
    }
    Json(json!({ "voices": state.cloned_voices })).into_response()
}
