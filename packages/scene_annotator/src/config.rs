//! Viewer configuration.
//!
//! Every field has a default so a partial (or empty) JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::color::{parse_hex_color, Rgb};
use crate::error::{parse_document, read_document, Document, ViewerError};

/// Default viewer background.
fn default_background_color() -> String {
    "#f0f0f0".to_string()
}

/// Color given to annotations created by selecting an entity.
fn default_annotation_color() -> String {
    "#ff0000".to_string()
}

/// Glyph drawn inside annotation markers.
fn default_marker_glyph() -> String {
    "●".to_string()
}

/// Appearance restored by `ColorResetPolicy::ResetToDefault`.
fn default_reset_color() -> String {
    "#ffffff".to_string()
}

/// What happens to an entity whose `color` disappears from the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorResetPolicy {
    /// Leave the last applied color in place.
    #[default]
    KeepLast,
    /// Restore the configured reset color.
    ResetToDefault,
}

/// Which entry wins when the desired state repeats an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
    FirstWins,
    #[default]
    LastWins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    #[serde(default = "default_background_color")]
    pub background_color: String,

    #[serde(default = "default_annotation_color")]
    pub default_annotation_color: String,

    #[serde(default = "default_marker_glyph")]
    pub marker_glyph: String,

    #[serde(default)]
    pub color_reset: ColorResetPolicy,

    #[serde(default = "default_reset_color")]
    pub reset_color: String,

    #[serde(default)]
    pub duplicate_ids: DuplicatePolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            background_color: default_background_color(),
            default_annotation_color: default_annotation_color(),
            marker_glyph: default_marker_glyph(),
            color_reset: ColorResetPolicy::default(),
            reset_color: default_reset_color(),
            duplicate_ids: DuplicatePolicy::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let config: ViewerConfig = parse_document(Document::Config, json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let json = read_document(Document::Config, path.as_ref())?;
        Self::from_json(&json)
    }

    /// All color fields must be valid `#RRGGBB` strings.
    pub fn validate(&self) -> Result<(), ViewerError> {
        for (name, value) in [
            ("backgroundColor", &self.background_color),
            ("defaultAnnotationColor", &self.default_annotation_color),
            ("resetColor", &self.reset_color),
        ] {
            parse_hex_color(value).map_err(|source| ViewerError::BadColor {
                field: name,
                source,
            })?;
        }
        Ok(())
    }

    pub fn background_rgb(&self) -> Rgb {
        parse_hex_color(&self.background_color).unwrap_or(Rgb::new(0.94, 0.94, 0.94))
    }

    pub fn reset_rgb(&self) -> Rgb {
        parse_hex_color(&self.reset_color).unwrap_or(Rgb::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.background_color, "#f0f0f0");
        assert_eq!(config.default_annotation_color, "#ff0000");
        assert_eq!(config.marker_glyph, "●");
        assert_eq!(config.color_reset, ColorResetPolicy::KeepLast);
        assert_eq!(config.duplicate_ids, DuplicatePolicy::LastWins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = ViewerConfig::from_json("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config =
            ViewerConfig::from_json(r#"{"colorReset":"resetToDefault","duplicateIds":"firstWins"}"#)
                .unwrap();
        assert_eq!(config.color_reset, ColorResetPolicy::ResetToDefault);
        assert_eq!(config.duplicate_ids, DuplicatePolicy::FirstWins);
        assert_eq!(config.background_color, "#f0f0f0");
    }

    #[test]
    fn test_bad_color_rejected() {
        let err = ViewerConfig::from_json(r#"{"defaultAnnotationColor":"red"}"#).unwrap_err();
        assert_eq!(err.document(), Document::Config);
        assert!(err.to_string().contains("defaultAnnotationColor"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r##"{"backgroundColor":"#000000"}"##).unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.background_rgb(), Rgb::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ViewerConfig::load("/nonexistent/viewer.json").unwrap_err();
        assert_eq!(err.document(), Document::Config);
    }
}
