//! Voice catalog entries returned by the voice endpoints.
//!
//! Both catalogs are read-only snapshots fetched on demand; nothing here
//! is cached.

use serde::{Deserialize, Serialize};

/// A server-side synthetic voice selectable by language and gender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinVoice {
    /// Voice short name, e.g. `vi-VN-NamMinhNeural`.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl BuiltinVoice {
    /// Display label: `"<name> (<id>)"`, or just the id when unnamed.
    pub fn label(&self) -> String {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("{name} ({})", self.id),
            None => self.id.clone(),
        }
    }
}
