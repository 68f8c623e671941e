//! Paths of the lecture REST API, relative to the server base URL.

use crate::types::JobId;

pub const JOBS: &str = "/api/jobs";
pub const CLONED_VOICES: &str = "/api/voices/cloned";
pub const BUILTIN_VOICES: &str = "/api/voices/builtin";

fn job_path(id: &JobId, suffix: &str) -> String {
    format!("{JOBS}/{id}/{suffix}")
}

pub fn upload(id: &JobId) -> String {
    job_path(id, "upload")
}

pub fn clone_voice(id: &JobId) -> String {
    job_path(id, "clone-voice")
}

pub fn config(id: &JobId) -> String {
    job_path(id, "config")
}

pub fn extract(id: &JobId) -> String {
    job_path(id, "extract")
}

pub fn slides_text(id: &JobId) -> String {
    job_path(id, "slides-text")
}

pub fn generate(id: &JobId) -> String {
    job_path(id, "generate")
}

pub fn status(id: &JobId) -> String {
    job_path(id, "status")
}

/// Attachment download of the finished video.
pub fn result(id: &JobId) -> String {
    job_path(id, "result")
}

/// Inline, streamable view of the finished video.
pub fn media_video(id: &JobId) -> String {
    format!("/media/jobs/{id}/video")
}
