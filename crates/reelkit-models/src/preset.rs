//! Platform presets and resize geometry policies.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aspect ratio as a reduced `W:H` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Vertical short-form (9:16)
    pub const PORTRAIT: AspectRatio = AspectRatio::new(9, 16);
    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio::new(1, 1);
    /// Instagram portrait (4:5)
    pub const INSTAGRAM_PORTRAIT: AspectRatio = AspectRatio::new(4, 5);
    /// Landscape (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio::new(16, 9);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn is_vertical(&self) -> bool {
        self.height > self.width
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// How a source frame is fitted into a target frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Fill the frame and center-crop the excess. Never letterboxes.
    #[default]
    Cover,
    /// Fit the whole frame and pad the borders. Never crops.
    Contain,
    /// Resize to the exact target, ignoring aspect ratio.
    Stretch,
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResizeMode::Cover => "cover",
            ResizeMode::Contain => "contain",
            ResizeMode::Stretch => "stretch",
        };
        f.write_str(s)
    }
}

/// Named output geometry for a publishing destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformPreset {
    pub id: &'static str,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: AspectRatio,
    /// Longest clip the destination accepts, if it enforces one.
    pub max_duration_secs: Option<f64>,
}

impl PlatformPreset {
    pub fn is_vertical(&self) -> bool {
        self.height > self.width
    }
}

/// Static preset table, keyed by `id`.
pub static PLATFORM_PRESETS: &[PlatformPreset] = &[
    PlatformPreset {
        id: "tiktok",
        width: 1080,
        height: 1920,
        aspect_ratio: AspectRatio::PORTRAIT,
        max_duration_secs: Some(600.0),
    },
    PlatformPreset {
        id: "instagram_reels",
        width: 1080,
        height: 1920,
        aspect_ratio: AspectRatio::PORTRAIT,
        max_duration_secs: Some(90.0),
    },
    PlatformPreset {
        id: "youtube_shorts",
        width: 1080,
        height: 1920,
        aspect_ratio: AspectRatio::PORTRAIT,
        max_duration_secs: Some(60.0),
    },
    PlatformPreset {
        id: "instagram_feed",
        width: 1080,
        height: 1080,
        aspect_ratio: AspectRatio::SQUARE,
        max_duration_secs: Some(60.0),
    },
    PlatformPreset {
        id: "instagram_portrait",
        width: 1080,
        height: 1350,
        aspect_ratio: AspectRatio::INSTAGRAM_PORTRAIT,
        max_duration_secs: Some(60.0),
    },
    PlatformPreset {
        id: "youtube",
        width: 1920,
        height: 1080,
        aspect_ratio: AspectRatio::LANDSCAPE,
        max_duration_secs: None,
    },
    PlatformPreset {
        id: "twitter",
        width: 1280,
        height: 720,
        aspect_ratio: AspectRatio::LANDSCAPE,
        max_duration_secs: Some(140.0),
    },
    PlatformPreset {
        id: "linkedin",
        width: 1920,
        height: 1080,
        aspect_ratio: AspectRatio::LANDSCAPE,
        max_duration_secs: Some(600.0),
    },
    PlatformPreset {
        id: "facebook",
        width: 1080,
        height: 1080,
        aspect_ratio: AspectRatio::SQUARE,
        max_duration_secs: Some(240.0),
    },
    PlatformPreset {
        id: "snapchat",
        width: 1080,
        height: 1920,
        aspect_ratio: AspectRatio::PORTRAIT,
        max_duration_secs: Some(60.0),
    },
];

/// Look up a preset by id (case-insensitive, `-` and `_` interchangeable).
pub fn find_preset(id: &str) -> Option<&'static PlatformPreset> {
    let wanted = id.trim().to_ascii_lowercase().replace('-', "_");
    PLATFORM_PRESETS.iter().find(|p| p.id == wanted)
}
