//! Versioned theme payload carried inside permalinks.
//!
//! The payload travels as percent-encoded JSON in the `theme` query key.
//! The schema is tagged with a `version` field; unknown fields are ignored
//! so newer producers do not break older consumers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current theme payload schema version.
pub const THEME_VERSION: &str = "1.0";

/// Upper bound on the encoded theme payload, in bytes. Oversized payloads
/// are rejected before JSON parsing.
pub const MAX_THEME_BYTES: usize = 64 * 1024;

/// Per-layer display state inside a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub name: String,

    pub visible: bool,

    /// Layer opacity in [0, 1]
    #[serde(default = "default_opacity")]
    pub opacity: f64,

    /// Named style override, when the layer has more than one style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_style: Option<String>,
}

fn default_opacity() -> f64 {
    1.0
}

/// A versioned map-theme snapshot: which theme is active and the visibility
/// state of each layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeState {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_theme: Option<String>,

    #[serde(default)]
    pub layer_states: BTreeMap<String, LayerState>,
}

impl ThemeState {
    pub fn new(current_theme: impl Into<String>) -> Self {
        Self {
            version: THEME_VERSION.to_string(),
            current_theme: Some(current_theme.into()),
            layer_states: BTreeMap::new(),
        }
    }

    /// Parse a theme payload from raw (already percent-decoded) JSON.
    ///
    /// The `version` tag selects the parse strategy; only "1.0" exists
    /// today, and unknown versions are parsed leniently with the 1.0 field
    /// set so that forward-compatible payloads still resolve. Returns `None`
    /// for anything unusable; a broken theme never fails the enclosing
    /// permalink decode.
    pub fn from_json(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > MAX_THEME_BYTES {
            return None;
        }
        serde_json::from_str(raw).ok()
    }

    /// Serialize to the canonical JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// IDs of layers marked visible.
    pub fn visible_layer_ids(&self) -> Vec<&str> {
        self.layer_states
            .iter()
            .filter(|(_, state)| state.visible)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
