use crate::commands::{validate_font_size, FORMAT_BLOCK_TAGS};
use crate::errors::EditorError;
use serde::{Deserialize, Serialize};

/// Editor settings, read from JSON with camelCase keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Size shown in the font-size box before anything is committed
    #[serde(default = "default_font_size")]
    pub default_font_size: u32,

    /// Undo levels kept (0 = unlimited)
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Tag of the editable surface element
    #[serde(default = "default_surface_tag")]
    pub surface_tag: String,
}

fn default_font_size() -> u32 {
    16
}

fn default_history_depth() -> usize {
    100
}

fn default_surface_tag() -> String {
    "div".to_string()
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), EditorError> {
        validate_font_size(self.default_font_size)
            .map_err(|e| EditorError::Config(format!("defaultFontSize: {}", e)))?;
        if !FORMAT_BLOCK_TAGS.contains(&self.surface_tag.as_str()) {
            return Err(EditorError::Config(format!(
                "surfaceTag: '{}' is not a block tag",
                self.surface_tag
            )));
        }
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_font_size: default_font_size(),
            history_depth: default_history_depth(),
            surface_tag: default_surface_tag(),
        }
    }
}
