//! Clip-to-clip transitions for merged videos.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default crossfade duration in seconds.
pub const DEFAULT_TRANSITION_SECS: f64 = 0.5;
/// Longest crossfade a caller may request.
pub const MAX_TRANSITION_SECS: f64 = 5.0;

/// Transition between consecutive clips.
///
/// `None` means hard cuts: the merger concatenates instead of building a
/// crossfade graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    #[default]
    None,
    Fade,
    FadeBlack,
    FadeWhite,
    Dissolve,
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    CircleOpen,
    CircleClose,
    Pixelize,
    Radial,
    SmoothLeft,
    SmoothRight,
    #[serde(alias = "zoom")]
    ZoomIn,
}

impl Transition {
    /// The `xfade` transition name, or `None` for hard cuts.
    pub fn xfade_name(self) -> Option<&'static str> {
        let name = match self {
            Transition::None => return None,
            Transition::Fade => "fade",
            Transition::FadeBlack => "fadeblack",
            Transition::FadeWhite => "fadewhite",
            Transition::Dissolve => "dissolve",
            Transition::WipeLeft => "wipeleft",
            Transition::WipeRight => "wiperight",
            Transition::WipeUp => "wipeup",
            Transition::WipeDown => "wipedown",
            Transition::SlideLeft => "slideleft",
            Transition::SlideRight => "slideright",
            Transition::SlideUp => "slideup",
            Transition::SlideDown => "slidedown",
            Transition::CircleOpen => "circleopen",
            Transition::CircleClose => "circleclose",
            Transition::Pixelize => "pixelize",
            Transition::Radial => "radial",
            Transition::SmoothLeft => "smoothleft",
            Transition::SmoothRight => "smoothright",
            Transition::ZoomIn => "zoomin",
        };
        Some(name)
    }

    pub fn is_none(self) -> bool {
        self == Transition::None
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xfade_name().unwrap_or("none"))
    }
}
