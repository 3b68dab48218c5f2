//! Operation results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::preset::ResizeMode;
use crate::text::{CardPosition, TextPosition};
use crate::transition::Transition;

/// A merge transition failed and the clips were joined with hard cuts.
pub const WARNING_TRANSITION_DROPPED: &str = "transition_dropped";
/// The source exceeded the preset's duration limit and was cut short.
pub const WARNING_TRUNCATED: &str = "truncated_to_platform_limit";
/// The source audio could not be re-encoded and was replaced with silence.
pub const WARNING_AUDIO_REPLACED: &str = "audio_replaced_with_silence";

/// Output of a media operation.
///
/// The encoded file is carried in `buffer` and is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperationResult {
    #[serde(skip)]
    pub buffer: Vec<u8>,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub details: OperationDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl OperationResult {
    pub fn has_warning(&self, warning: &str) -> bool {
        self.warnings.iter().any(|w| w == warning)
    }

    pub fn operation(&self) -> &'static str {
        self.details.operation()
    }
}

/// Operation-specific result fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationDetails {
    Merge {
        clip_count: usize,
        is_vertical: bool,
        transition: Transition,
        /// False when the transition was dropped in favour of hard cuts.
        transition_applied: bool,
    },
    Resize {
        preset: Option<String>,
        mode: ResizeMode,
        source_width: u32,
        source_height: u32,
    },
    Trim {
        start_secs: f64,
        end_secs: f64,
        reencoded: bool,
    },
    Speed {
        factor: f64,
        maintain_pitch: bool,
    },
    Reverse {
        audio_reversed: bool,
    },
    TextOverlay {
        text: String,
        position: TextPosition,
    },
    TitleCard {
        title: String,
        position: CardPosition,
        card_duration_secs: f64,
    },
    Captions {
        caption_count: usize,
    },
    AudioRemix {
        shape: RemixShape,
    },
}

impl OperationDetails {
    pub fn operation(&self) -> &'static str {
        match self {
            OperationDetails::Merge { .. } => "merge",
            OperationDetails::Resize { .. } => "resize",
            OperationDetails::Trim { .. } => "trim",
            OperationDetails::Speed { .. } => "speed",
            OperationDetails::Reverse { .. } => "reverse",
            OperationDetails::TextOverlay { .. } => "text_overlay",
            OperationDetails::TitleCard { .. } => "title_card",
            OperationDetails::Captions { .. } => "captions",
            OperationDetails::AudioRemix { .. } => "audio_remix",
        }
    }
}

/// Audio track layout produced by a remix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemixShape {
    /// Original audio mixed with looped music.
    Mixed,
    /// Looped music replaces the original audio.
    MusicOnly,
    /// Original audio at an adjusted volume.
    OriginalOnly,
    /// Synthesized silence.
    Silent,
}

impl RemixShape {
    /// Pick the shape from the two inputs that decide it.
    pub fn select(has_music: bool, keep_original: bool) -> Self {
        match (has_music, keep_original) {
            (true, true) => RemixShape::Mixed,
            (true, false) => RemixShape::MusicOnly,
            (false, true) => RemixShape::OriginalOnly,
            (false, false) => RemixShape::Silent,
        }
    }
}

impl fmt::Display for RemixShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemixShape::Mixed => "mixed",
            RemixShape::MusicOnly => "music_only",
            RemixShape::OriginalOnly => "original_only",
            RemixShape::Silent => "silent",
        };
        f.write_str(s)
    }
}
