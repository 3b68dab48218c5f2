//! Playback speed and direction graphs.

use super::audio::{atempo_chain, pitch_shift_chain};
use super::{short_num, FilterGraph};

/// Retime video by `factor`, and audio too when the source has any.
///
/// With `maintain_pitch` the audio goes through an `atempo` chain; without
/// it the sample rate is scaled, which shifts pitch along with tempo.
pub fn speed_graph(
    factor: f64,
    maintain_pitch: bool,
    has_audio: bool,
    sample_rate: u32,
) -> FilterGraph {
    let video = format!("[0:v]setpts=PTS/{}[vout]", short_num(factor));
    if !has_audio {
        return FilterGraph::new(video).with_video("vout");
    }

    let audio = if maintain_pitch {
        atempo_chain(factor)
    } else {
        pitch_shift_chain(factor, sample_rate)
    };
    FilterGraph::new(format!("{video};[0:a]{audio}[aout]"))
        .with_video("vout")
        .with_audio("aout")
}

/// Reverse video, and audio when requested and present.
///
/// Returns `audio_label: None` when audio is either absent or should be
/// kept playing forward; the caller maps the source audio directly then.
pub fn reverse_graph(reverse_audio: bool, has_audio: bool) -> FilterGraph {
    if reverse_audio && has_audio {
        FilterGraph::new("[0:v]reverse[vout];[0:a]areverse[aout]")
            .with_video("vout")
            .with_audio("aout")
    } else {
        FilterGraph::new("[0:v]reverse[vout]").with_video("vout")
    }
}
