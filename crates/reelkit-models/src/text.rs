//! Text overlay styling and placement.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::request::MAX_TEXT_CHARS;
use crate::timestamp::TimeSpec;

/// Nine-point placement grid for overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TextPosition::TopLeft => "top_left",
            TextPosition::TopCenter => "top_center",
            TextPosition::TopRight => "top_right",
            TextPosition::CenterLeft => "center_left",
            TextPosition::Center => "center",
            TextPosition::CenterRight => "center_right",
            TextPosition::BottomLeft => "bottom_left",
            TextPosition::BottomCenter => "bottom_center",
            TextPosition::BottomRight => "bottom_right",
        };
        f.write_str(s)
    }
}

/// Where a title card is inserted relative to the source clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardPosition {
    #[default]
    Start,
    End,
}

impl fmt::Display for CardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardPosition::Start => f.write_str("start"),
            CardPosition::End => f.write_str("end"),
        }
    }
}

/// Font and background styling for rendered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TextStyle {
    #[serde(default = "default_font_size")]
    #[validate(range(min = 8, max = 400))]
    pub font_size: u32,

    /// Any color the engine understands (`white`, `#FFCC00`, `0xFFCC00`).
    #[serde(default = "default_font_color")]
    #[validate(length(min = 1, max = 32))]
    pub font_color: String,

    /// Draw a filled box behind the text.
    #[serde(default)]
    pub background_box: bool,

    #[serde(default = "default_box_color")]
    #[validate(length(min = 1, max = 32))]
    pub box_color: String,

    /// Box opacity, 0.0 (transparent) to 1.0 (opaque).
    #[serde(default = "default_box_opacity")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub box_opacity: f64,

    /// Outline width in pixels; 0 disables the outline.
    #[serde(default)]
    #[validate(range(max = 20))]
    pub border_width: u32,

    /// Font file on the local filesystem. Falls back to the configured font.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_file: Option<String>,
}

fn default_font_size() -> u32 {
    48
}
fn default_font_color() -> String {
    "white".to_string()
}
fn default_box_color() -> String {
    "black".to_string()
}
fn default_box_opacity() -> f64 {
    0.5
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font_color: default_font_color(),
            background_box: false,
            box_color: default_box_color(),
            box_opacity: default_box_opacity(),
            border_width: 0,
            font_file: None,
        }
    }
}

/// One time-windowed caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct Caption {
    #[validate(length(min = 1, max = "MAX_TEXT_CHARS"))]
    pub text: String,
    pub start: TimeSpec,
    pub end: TimeSpec,
    #[serde(default)]
    pub position: TextPosition,
    #[serde(default)]
    #[validate(nested)]
    pub style: TextStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_style_defaults() {
        let style: TextStyle = serde_json::from_str("{}").unwrap();
        assert_eq!(style, TextStyle::default());
        assert!(style.validate().is_ok());
    }

    #[test]
    fn test_text_style_validation() {
        let style = TextStyle {
            box_opacity: 1.5,
            ..Default::default()
        };
        assert!(style.validate().is_err());

        let style = TextStyle {
            font_size: 2,
            ..Default::default()
        };
        assert!(style.validate().is_err());
    }

    #[test]
    fn test_caption_deserialize() {
        let caption: Caption = serde_json::from_str(
            r#"{"text": "hello", "start": 1, "end": "00:00:03", "position": "top_left"}"#,
        )
        .unwrap();
        assert_eq!(caption.position, TextPosition::TopLeft);
        assert_eq!(caption.end.to_seconds().unwrap(), 3.0);
        assert!(caption.validate().is_ok());
    }
}
