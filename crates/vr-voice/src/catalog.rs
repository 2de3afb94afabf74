//! Voice catalog
//!
//! Maps a user supplied selector (catalog key, voice name or raw provider
//! id) to the provider voice id.

use serde::Serialize;
use vr_core::{VoiceEntry, VoicesConfig};

/// Entry as shown by the voice listing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    default_voice_id: String,
    entries: Vec<VoiceEntry>,
}

impl VoiceCatalog {
    pub fn new(config: &VoicesConfig) -> Self {
        Self {
            default_voice_id: config.default_voice_id.clone(),
            entries: config.entries.clone(),
        }
    }

    pub fn default_voice_id(&self) -> &str {
        &self.default_voice_id
    }

    pub fn entries(&self) -> &[VoiceEntry] {
        &self.entries
    }

    /// Resolve a selector to a voice id, falling back to the default voice
    pub fn resolve(&self, selector: Option<&str>) -> &str {
        let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
            return &self.default_voice_id;
        };

        self.entries
            .iter()
            .find(|entry| {
                entry.key == selector
                    || entry.id == selector
                    || entry.name.eq_ignore_ascii_case(selector)
            })
            .map(|entry| entry.id.as_str())
            .unwrap_or(self.default_voice_id.as_str())
    }

    /// Catalog keyed by selector key, in catalog order
    pub fn listing(&self) -> Vec<(String, VoiceInfo)> {
        self.entries
            .iter()
            .map(|entry| {
                (
                    entry.key.clone(),
                    VoiceInfo {
                        id: entry.id.clone(),
                        name: entry.name.clone(),
                        description: entry.description.clone(),
                    },
                )
            })
            .collect()
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new(&VoicesConfig::default())
    }
}
