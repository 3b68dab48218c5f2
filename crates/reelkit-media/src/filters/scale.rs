//! Scale, pad and crop.

use reelkit_models::encoding::DEFAULT_PIXEL_FORMAT;
use reelkit_models::ResizeMode;

/// Round to the nearest even integer, never below 2.
pub fn round_even(value: f64) -> u32 {
    let rounded = (value / 2.0).round() * 2.0;
    rounded.max(2.0) as u32
}

/// Round down to an even integer, never below 2.
pub fn even_floor(value: f64) -> u32 {
    ((value / 2.0).floor() * 2.0).max(2.0) as u32
}

/// Sizes a scale/pad/crop chain passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedGeometry {
    /// Size after the scale step.
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Size of the final frame.
    pub output_width: u32,
    pub output_height: u32,
    /// The scaled frame overflows the target and is center-cropped.
    pub crops: bool,
    /// The scaled frame underfills the target and is padded.
    pub pads: bool,
}

/// Compute the geometry of fitting `src` into `target` with `mode`.
pub fn planned_geometry(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
    mode: ResizeMode,
) -> PlannedGeometry {
    let sw = src_width.max(1) as f64;
    let sh = src_height.max(1) as f64;
    let tw = target_width as f64;
    let th = target_height as f64;

    let (scaled_width, scaled_height) = match mode {
        ResizeMode::Stretch => (target_width, target_height),
        _ if src_width == target_width && src_height == target_height => {
            (target_width, target_height)
        }
        ResizeMode::Cover => {
            let factor = (tw / sw).max(th / sh);
            (
                round_even(sw * factor).max(target_width),
                round_even(sh * factor).max(target_height),
            )
        }
        ResizeMode::Contain => {
            let factor = (tw / sw).min(th / sh);
            (
                round_even(sw * factor).min(target_width),
                round_even(sh * factor).min(target_height),
            )
        }
    };

    PlannedGeometry {
        scaled_width,
        scaled_height,
        output_width: target_width,
        output_height: target_height,
        crops: mode == ResizeMode::Cover
            && (scaled_width > target_width || scaled_height > target_height),
        pads: mode == ResizeMode::Contain
            && (scaled_width < target_width || scaled_height < target_height),
    }
}

/// Video filter chain fitting a `src` frame into `target` with `mode`.
pub fn scale_filter(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
    mode: ResizeMode,
) -> String {
    let (tw, th) = (target_width, target_height);
    let identity = src_width == tw && src_height == th;
    match mode {
        ResizeMode::Cover if identity => format!("scale={tw}:{th},setsar=1"),
        ResizeMode::Cover => format!(
            "scale={tw}:{th}:force_original_aspect_ratio=increase,crop={tw}:{th},setsar=1"
        ),
        // Same size in and out: no padding, frame untouched
        ResizeMode::Contain if identity => format!("scale={tw}:{th},setsar=1"),
        ResizeMode::Contain => format!(
            "scale={tw}:{th}:force_original_aspect_ratio=decrease,\
             pad={tw}:{th}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1"
        ),
        ResizeMode::Stretch => format!("scale={tw}:{th},setsar=1"),
    }
}

/// Contain-fit plus frame rate and pixel format normalization.
pub fn normalize_video_chain(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
    fps: u32,
) -> String {
    format!(
        "{},fps={fps},format={DEFAULT_PIXEL_FORMAT}",
        scale_filter(src_width, src_height, target_width, target_height, ResizeMode::Contain)
    )
}
