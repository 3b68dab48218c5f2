//! Audio filter builders: tempo chains, silence and remix shapes.

use reelkit_models::encoding::DEFAULT_AUDIO_SAMPLE_RATE;
use reelkit_models::RemixShape;

use super::{num, short_num, FilterGraph};

/// Range a single `atempo` stage accepts.
pub const ATEMPO_MIN: f64 = 0.5;
pub const ATEMPO_MAX: f64 = 2.0;

/// Split a tempo factor into `atempo` stages that each lie in `[0.5, 2.0]`
/// and multiply back to `factor`.
///
/// A factor of exactly 1.0 yields a single neutral stage. Factors that are
/// not finite and positive yield no stages.
pub(crate) fn decompose_tempo(factor: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    if !factor.is_finite() || factor <= 0.0 {
        return stages;
    }
    let mut remaining = factor;

    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    if (remaining - 1.0).abs() > 1e-9 || stages.is_empty() {
        stages.push(remaining);
    }

    stages
}

/// Render [`decompose_tempo`] as a filter chain.
pub fn atempo_chain(factor: f64) -> String {
    decompose_tempo(factor)
        .iter()
        .map(|stage| format!("atempo={}", short_num(*stage)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Speed change without pitch correction: resample at a scaled rate, then
/// convert back to the original rate.
pub fn pitch_shift_chain(factor: f64, sample_rate: u32) -> String {
    let shifted = (sample_rate as f64 * factor).round() as u64;
    format!("asetrate={shifted},aresample={sample_rate}")
}

/// Stereo silence of `duration` seconds, as a filter source.
pub fn silent_track(duration: f64) -> String {
    format!(
        "anullsrc=channel_layout=stereo:sample_rate={DEFAULT_AUDIO_SAMPLE_RATE},atrim=0:{}",
        num(duration)
    )
}

/// Resample to the pipeline's stereo 44.1 kHz layout.
pub fn normalize_audio_chain() -> String {
    format!("aresample={DEFAULT_AUDIO_SAMPLE_RATE},aformat=sample_fmts=fltp:channel_layouts=stereo")
}

/// `volume` filter for a percentage (100 = unchanged).
pub fn volume_filter(percent: u32) -> String {
    format!("volume={:.2}", percent as f64 / 100.0)
}

/// Audio graph for a remix.
///
/// Input 0 is the video, input 1 the music (looped by the caller). The
/// graph always ends at `[aout]` and lasts `duration` seconds.
pub fn remix_graph(
    shape: RemixShape,
    original_volume: u32,
    music_volume: u32,
    duration: f64,
) -> FilterGraph {
    let music = format!(
        "[1:a]{},atrim=0:{},asetpts=PTS-STARTPTS",
        volume_filter(music_volume),
        num(duration)
    );
    let graph = match shape {
        // The original is padded to the full length so a short track never
        // ends the mix early; amix must not rescale the requested volumes.
        RemixShape::Mixed => format!(
            "[0:a]{},apad,atrim=0:{}[a0];{music}[a1];\
             [a0][a1]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[aout]",
            volume_filter(original_volume),
            num(duration)
        ),
        RemixShape::MusicOnly => format!("{music}[aout]"),
        RemixShape::OriginalOnly => format!("[0:a]{}[aout]", volume_filter(original_volume)),
        RemixShape::Silent => format!("{}[aout]", silent_track(duration)),
    };
    FilterGraph::new(graph).with_audio("aout")
}
