use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Server-minted handle of a lecture job.
///
/// Opaque to the client: it is never inspected, only echoed back in
/// request paths and navigation locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Build an identifier from user or server input.
    ///
    /// Surrounding whitespace is dropped; blank input yields `None` so
    /// that an empty `?job=` behaves like an absent one.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

/// Upload slot tag sent as the `kind` multipart field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SourceImage,
    Pptx,
    VoiceSample,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceImage => "source_image",
            Self::Pptx => "pptx",
            Self::VoiceSample => "voice_sample",
        }
    }

    /// Noun used in operator-facing messages ("no image selected").
    pub fn noun(&self) -> &'static str {
        match self {
            Self::SourceImage => "image",
            Self::Pptx => "slide deck",
            Self::VoiceSample => "voice sample",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "source_image" => Ok(Self::SourceImage),
            "pptx" => Ok(Self::Pptx),
            "voice_sample" => Ok(Self::VoiceSample),
            other => Err(CoreError::UnknownArtifactKind(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Navigation targets
// ---------------------------------------------------------------------------

/// Pages a flow hands off to once it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Editor,
    Result,
}

impl Page {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Editor => "/editor",
            Self::Result => "/result",
        }
    }
}

/// Query parameter carrying the job id across page transitions.
pub const JOB_QUERY_PARAM: &str = "job";
