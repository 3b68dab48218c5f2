//! Per-operation request payloads.
//!
//! Field-level bounds are expressed with `validator`; rules that depend on
//! more than one field (or on probed media) are checked by the services.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::encoding::{Quality, ResolutionTier};
use crate::preset::ResizeMode;
use crate::text::{CardPosition, Caption, TextPosition, TextStyle};
use crate::timestamp::TimeSpec;
use crate::transition::{Transition, DEFAULT_TRANSITION_SECS, MAX_TRANSITION_SECS};

/// Speed factor bounds accepted by [`SpeedRequest`].
pub const MIN_SPEED_FACTOR: f64 = 0.25;
pub const MAX_SPEED_FACTOR: f64 = 4.0;

/// Custom resize dimension bounds.
pub const MIN_CUSTOM_DIMENSION: u32 = 16;
pub const MAX_CUSTOM_DIMENSION: u32 = 4096;

/// Maximum length of any user-supplied overlay text.
pub const MAX_TEXT_CHARS: u64 = 500;
/// Maximum number of captions in one request.
pub const MAX_CAPTIONS: u64 = 200;
/// Maximum title card duration in seconds.
pub const MAX_TITLE_CARD_SECS: f64 = 10.0;
/// Maximum volume percentage.
pub const MAX_VOLUME_PERCENT: u32 = 200;

fn default_true() -> bool {
    true
}

/// Merge several clips into one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct MergeRequest {
    /// Source clip URLs, in playback order.
    pub urls: Vec<String>,

    #[serde(default)]
    pub resolution: ResolutionTier,

    #[serde(default)]
    pub quality: Quality,

    #[serde(default)]
    pub transition: Transition,

    /// Crossfade length in seconds. Ignored for hard cuts.
    #[serde(default = "default_transition_duration")]
    #[validate(range(exclusive_min = 0.0, max = "MAX_TRANSITION_SECS"))]
    pub transition_duration: f64,
}

fn default_transition_duration() -> f64 {
    DEFAULT_TRANSITION_SECS
}

impl MergeRequest {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            resolution: ResolutionTier::default(),
            quality: Quality::default(),
            transition: Transition::default(),
            transition_duration: DEFAULT_TRANSITION_SECS,
        }
    }

    pub fn with_transition(mut self, transition: Transition, duration: f64) -> Self {
        self.transition = transition;
        self.transition_duration = duration;
        self
    }
}

/// Resize a video to a platform preset or to custom dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ResizeRequest {
    pub url: String,

    /// Platform preset id, e.g. `tiktok` or `youtube_shorts`.
    #[serde(default)]
    pub preset: Option<String>,

    #[serde(default)]
    #[validate(range(min = "MIN_CUSTOM_DIMENSION", max = "MAX_CUSTOM_DIMENSION"))]
    pub custom_width: Option<u32>,

    #[serde(default)]
    #[validate(range(min = "MIN_CUSTOM_DIMENSION", max = "MAX_CUSTOM_DIMENSION"))]
    pub custom_height: Option<u32>,

    #[serde(default)]
    pub mode: ResizeMode,

    #[serde(default)]
    pub quality: Quality,
}

impl ResizeRequest {
    pub fn for_preset(url: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            preset: Some(preset.into()),
            custom_width: None,
            custom_height: None,
            mode: ResizeMode::default(),
            quality: Quality::default(),
        }
    }

    pub fn custom(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            preset: None,
            custom_width: Some(width),
            custom_height: Some(height),
            mode: ResizeMode::default(),
            quality: Quality::default(),
        }
    }

    pub fn with_mode(mut self, mode: ResizeMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Cut a segment out of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TrimRequest {
    pub url: String,
    pub start: TimeSpec,
    pub end: TimeSpec,

    /// Skip the stream-copy attempt and re-encode directly.
    #[serde(default)]
    pub reencode: bool,

    #[serde(default)]
    pub quality: Quality,
}

impl TrimRequest {
    pub fn new(
        url: impl Into<String>,
        start: impl Into<TimeSpec>,
        end: impl Into<TimeSpec>,
    ) -> Self {
        Self {
            url: url.into(),
            start: start.into(),
            end: end.into(),
            reencode: false,
            quality: Quality::default(),
        }
    }
}

/// Change playback speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct SpeedRequest {
    pub url: String,

    /// Playback multiplier: 2.0 plays twice as fast.
    pub factor: f64,

    /// Keep the original pitch when changing audio tempo.
    #[serde(default = "default_true")]
    pub maintain_pitch: bool,

    #[serde(default)]
    pub quality: Quality,
}

impl SpeedRequest {
    pub fn new(url: impl Into<String>, factor: f64) -> Self {
        Self {
            url: url.into(),
            factor,
            maintain_pitch: true,
            quality: Quality::default(),
        }
    }
}

/// Play a video backwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ReverseRequest {
    pub url: String,

    #[serde(default = "default_true")]
    pub reverse_audio: bool,

    #[serde(default)]
    pub quality: Quality,
}

impl ReverseRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reverse_audio: true,
            quality: Quality::default(),
        }
    }
}

/// Burn a single text overlay into a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TextOverlayRequest {
    pub url: String,

    #[validate(length(min = 1, max = "MAX_TEXT_CHARS"))]
    pub text: String,

    #[serde(default)]
    pub position: TextPosition,

    #[serde(default)]
    #[validate(nested)]
    pub style: TextStyle,

    /// Show the text from this point on. Defaults to the start of the clip.
    #[serde(default)]
    pub start: Option<TimeSpec>,

    /// Hide the text after this point. Defaults to the end of the clip.
    #[serde(default)]
    pub end: Option<TimeSpec>,

    #[serde(default)]
    pub quality: Quality,
}

impl TextOverlayRequest {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            position: TextPosition::default(),
            style: TextStyle::default(),
            start: None,
            end: None,
            quality: Quality::default(),
        }
    }
}

/// Insert a solid-color title card before or after a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TitleCardRequest {
    pub url: String,

    #[validate(length(min = 1, max = "MAX_TEXT_CHARS"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(min = 1, max = "MAX_TEXT_CHARS"))]
    pub subtitle: Option<String>,

    #[serde(default = "default_card_duration")]
    #[validate(range(exclusive_min = 0.0, max = "MAX_TITLE_CARD_SECS"))]
    pub duration_secs: f64,

    #[serde(default)]
    pub position: CardPosition,

    #[serde(default = "default_background_color")]
    #[validate(length(min = 1, max = 32))]
    pub background_color: String,

    #[serde(default = "default_text_color")]
    #[validate(length(min = 1, max = 32))]
    pub text_color: String,

    #[serde(default = "default_title_font_size")]
    #[validate(range(min = 8, max = 400))]
    pub title_font_size: u32,

    #[serde(default = "default_subtitle_font_size")]
    #[validate(range(min = 8, max = 400))]
    pub subtitle_font_size: u32,

    #[serde(default)]
    pub quality: Quality,
}

fn default_card_duration() -> f64 {
    3.0
}
fn default_background_color() -> String {
    "black".to_string()
}
fn default_text_color() -> String {
    "white".to_string()
}
fn default_title_font_size() -> u32 {
    72
}
fn default_subtitle_font_size() -> u32 {
    40
}

impl TitleCardRequest {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            subtitle: None,
            duration_secs: default_card_duration(),
            position: CardPosition::default(),
            background_color: default_background_color(),
            text_color: default_text_color(),
            title_font_size: default_title_font_size(),
            subtitle_font_size: default_subtitle_font_size(),
            quality: Quality::default(),
        }
    }
}

/// Burn a list of time-windowed captions into a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct CaptionsRequest {
    pub url: String,

    #[validate(length(min = 1, max = "MAX_CAPTIONS"), nested)]
    pub captions: Vec<Caption>,

    #[serde(default)]
    pub quality: Quality,
}

/// Replace, mix or mute the audio of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct AudioRemixRequest {
    pub video_url: String,

    #[serde(default)]
    pub mute_original: bool,

    #[serde(default)]
    pub music_url: Option<String>,

    /// Original track volume in percent.
    #[serde(default = "default_volume")]
    #[validate(range(max = "MAX_VOLUME_PERCENT"))]
    pub original_volume: u32,

    /// Music track volume in percent.
    #[serde(default = "default_volume")]
    #[validate(range(max = "MAX_VOLUME_PERCENT"))]
    pub music_volume: u32,
}

fn default_volume() -> u32 {
    100
}

impl AudioRemixRequest {
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            mute_original: false,
            music_url: None,
            original_volume: default_volume(),
            music_volume: default_volume(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_request_defaults() {
        let req: MergeRequest =
            serde_json::from_str(r#"{"urls": ["https://a/1.mp4", "https://a/2.mp4"]}"#).unwrap();
        assert_eq!(req.transition, Transition::None);
        assert_eq!(req.transition_duration, 0.5);
        assert_eq!(req.resolution, ResolutionTier::Original);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_merge_transition_duration_bounds() {
        let urls = vec!["https://a/1.mp4".to_string(), "https://a/2.mp4".to_string()];
        let req = MergeRequest::new(urls.clone()).with_transition(Transition::Fade, 0.0);
        assert!(req.validate().is_err());
        let req =
            MergeRequest::new(urls.clone()).with_transition(Transition::Fade, MAX_TRANSITION_SECS);
        assert!(req.validate().is_ok());
        let req = MergeRequest::new(urls).with_transition(Transition::Fade, 5.5);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_resize_custom_bounds() {
        assert!(ResizeRequest::custom("https://a/v.mp4", 720, 1280).validate().is_ok());
        assert!(ResizeRequest::custom("https://a/v.mp4", 8, 1280).validate().is_err());
        assert!(ResizeRequest::custom("https://a/v.mp4", 720, 8192).validate().is_err());
    }

    #[test]
    fn test_speed_defaults() {
        let req: SpeedRequest =
            serde_json::from_str(r#"{"url": "https://a/v.mp4", "factor": 2}"#).unwrap();
        assert!(req.maintain_pitch);
        assert_eq!(req.factor, 2.0);
    }

    #[test]
    fn test_text_length_limit() {
        let at_limit = "x".repeat(MAX_TEXT_CHARS as usize);
        assert!(TextOverlayRequest::new("https://a/v.mp4", at_limit).validate().is_ok());
        let too_long = "x".repeat(MAX_TEXT_CHARS as usize + 1);
        let req = TextOverlayRequest::new("https://a/v.mp4", too_long);
        assert!(req.validate().is_err());
        let req = TextOverlayRequest::new("https://a/v.mp4", "");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_title_card_duration() {
        let mut req = TitleCardRequest::new("https://a/v.mp4", "Hello");
        assert!(req.validate().is_ok());
        req.duration_secs = MAX_TITLE_CARD_SECS;
        assert!(req.validate().is_ok());
        req.duration_secs = MAX_TITLE_CARD_SECS + 0.5;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_remix_volume_bounds() {
        let mut req = AudioRemixRequest::new("https://a/v.mp4");
        assert!(req.validate().is_ok());
        req.music_volume = MAX_VOLUME_PERCENT;
        req.original_volume = MAX_VOLUME_PERCENT;
        assert!(req.validate().is_ok());
        req.music_volume = MAX_VOLUME_PERCENT + 1;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_captions_require_entries() {
        let req = CaptionsRequest {
            url: "https://a/v.mp4".to_string(),
            captions: vec![],
            quality: Quality::default(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_caption_count_limit() {
        let caption = Caption {
            text: "hi".to_string(),
            start: TimeSpec::Seconds(0.0),
            end: TimeSpec::Seconds(1.0),
            position: TextPosition::default(),
            style: TextStyle::default(),
        };
        let mut req = CaptionsRequest {
            url: "https://a/v.mp4".to_string(),
            captions: vec![caption; MAX_CAPTIONS as usize],
            quality: Quality::default(),
        };
        assert!(req.validate().is_ok());
        req.captions.push(req.captions[0].clone());
        assert!(req.validate().is_err());
    }
}
