//! Job configuration value object (`POST /api/jobs/{id}/config`).
//!
//! Assembled once from operator selections and submitted atomically.
//! The server replaces any previous config wholesale and is the only
//! party that validates it.

use serde::{Deserialize, Serialize};

/// Default narration language.
pub const DEFAULT_LANGUAGE: &str = "vi";

/// Default narrator gender, as labelled by the server's voice catalog.
pub const DEFAULT_GENDER: &str = "Nữ";

/// Localized label the server accepts as a synonym for `clone`.
const CLONE_LABEL_LOCALIZED: &str = "giọng nhân bản";

/// Where the narration voice comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    #[default]
    Builtin,
    Clone,
}

impl VoiceMode {
    /// Map a free-form selector label onto a voice mode.
    ///
    /// Matches the server's own normalization: anything that is not a
    /// clone label falls back to `Builtin`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label == "clone" || label == CLONE_LABEL_LOCALIZED || label.contains("nhân") {
            Self::Clone
        } else {
            Self::Builtin
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Clone => "clone",
        }
    }
}

/// Talking-head rendering knobs read by the generation worker.
///
/// Every field is optional; unset fields are omitted from the request
/// so the worker applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocess_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_still_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_of_image: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_style: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<f32>,
}

/// Voice and rendering configuration of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub voice_mode: VoiceMode,
    pub language: String,
    pub gender: String,
    pub builtin_voice: Option<String>,
    pub cloned_voice_name: Option<String>,
    pub cloned_lang: Option<String>,
    #[serde(flatten)]
    pub render: RenderOptions,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            voice_mode: VoiceMode::Builtin,
            language: DEFAULT_LANGUAGE.to_string(),
            gender: DEFAULT_GENDER.to_string(),
            builtin_voice: None,
            cloned_voice_name: None,
            cloned_lang: None,
            render: RenderOptions::default(),
        }
    }
}

impl JobConfig {
    /// Config narrated by a server-side synthetic voice.
    pub fn builtin(language: &str, gender: &str, voice: Option<&str>) -> Self {
        Self {
            voice_mode: VoiceMode::Builtin,
            language: language.to_string(),
            gender: gender.to_string(),
            builtin_voice: voice.map(str::to_string),
            ..Self::default()
        }
    }

    /// Config narrated by a previously cloned voice.
    pub fn cloned(language: &str, voice_name: &str, cloned_lang: Option<&str>) -> Self {
        Self {
            voice_mode: VoiceMode::Clone,
            language: language.to_string(),
            cloned_voice_name: Some(voice_name.to_string()),
            cloned_lang: cloned_lang.map(str::to_string),
            ..Self::default()
        }
    }

    /// Copy of this config ready for submission.
    ///
    /// Blank optional selections become `None` (sent as `null`) and blank
    /// language/gender fall back to the defaults.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.builtin_voice = non_blank(out.builtin_voice);
        out.cloned_voice_name = non_blank(out.cloned_voice_name);
        out.cloned_lang = non_blank(out.cloned_lang);
        out.render.preprocess_type = non_blank(out.render.preprocess_type);
        if out.language.trim().is_empty() {
            out.language = DEFAULT_LANGUAGE.to_string();
        }
        if out.gender.trim().is_empty() {
            out.gender = DEFAULT_GENDER.to_string();
        }
        out
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
