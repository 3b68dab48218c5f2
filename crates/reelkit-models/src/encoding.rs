//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Pixel format every output is normalized to.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Audio sample rate used for normalized and synthesized tracks.
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44_100;
/// Frame rate clips are normalized to before merging.
pub const NORMALIZED_FPS: u32 = 30;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Output pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            pixel_format: default_pixel_format(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Apply a quality tier on top of this config.
    pub fn for_quality(self, quality: Quality) -> Self {
        self.with_crf(quality.crf()).with_preset(quality.preset())
    }

    /// Video encoder arguments (`-c:v`, `-preset`, `-crf`, `-pix_fmt`).
    pub fn video_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ]
    }

    /// Audio encoder arguments (`-c:a`, `-b:a`).
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }

    /// Convert to FFmpeg command arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = self.video_args();
        args.extend(self.audio_args());
        args.extend(self.extra_args.clone());
        args
    }
}

/// Output quality tier requested by callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn crf(self) -> u8 {
        match self {
            Quality::Low => 28,
            Quality::Medium => 23,
            Quality::High => 18,
        }
    }

    pub fn preset(self) -> &'static str {
        match self {
            Quality::Low => "veryfast",
            Quality::Medium => "fast",
            Quality::High => "medium",
        }
    }
}

/// Output resolution tier for merged videos.
///
/// The tier caps the short side of the output (width for vertical output,
/// height for landscape output). `Original` keeps the reference clip size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    #[default]
    Original,
    #[serde(alias = "720p")]
    Hd720,
    #[serde(alias = "1080p")]
    Hd1080,
}

impl ResolutionTier {
    /// Maximum short-side length, if the tier imposes one.
    pub fn short_side_cap(self) -> Option<u32> {
        match self {
            ResolutionTier::Original => None,
            ResolutionTier::Hd720 => Some(720),
            ResolutionTier::Hd1080 => Some(1080),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.crf, 23);
        assert_eq!(config.pixel_format, "yuv420p");
    }

    #[test]
    fn test_ffmpeg_args() {
        let config = EncodingConfig::default().for_quality(Quality::High);
        let args = config.to_ffmpeg_args();
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"18".to_string()));
        assert!(args.contains(&"medium".to_string()));
        assert!(args.contains(&"-b:a".to_string()));
    }

    #[test]
    fn test_resolution_tier_aliases() {
        let tier: ResolutionTier = serde_json::from_str("\"720p\"").unwrap();
        assert_eq!(tier, ResolutionTier::Hd720);
        let tier: ResolutionTier = serde_json::from_str("\"hd1080\"").unwrap();
        assert_eq!(tier.short_side_cap(), Some(1080));
        assert_eq!(ResolutionTier::Original.short_side_cap(), None);
    }
}
