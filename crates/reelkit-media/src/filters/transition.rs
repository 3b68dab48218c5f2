//! N-ary crossfade graphs and concat lists.

use std::path::Path;

use reelkit_models::encoding::NORMALIZED_FPS;
use reelkit_models::Transition;

use super::{num, FilterGraph};

/// Final labels of a transition graph.
pub const VIDEO_OUT: &str = "vout";
pub const AUDIO_OUT: &str = "aout";

/// Shortest crossfade worth rendering: one frame of normalized output.
pub const MIN_TRANSITION_SECS: f64 = 1.0 / NORMALIZED_FPS as f64;

/// Clamp a requested crossfade so it never exceeds half of the shortest clip.
pub fn clamp_transition_duration(requested: f64, durations: &[f64]) -> f64 {
    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    if shortest.is_finite() {
        requested.min(shortest / 2.0).max(0.0)
    } else {
        requested
    }
}

/// `xfade` offsets for each join: the output length so far minus the
/// transition duration.
pub fn xfade_offsets(durations: &[f64], transition_secs: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(durations.len().saturating_sub(1));
    let Some(first) = durations.first() else {
        return offsets;
    };
    let mut accumulated = *first;
    for duration in &durations[1..] {
        offsets.push(accumulated - transition_secs);
        accumulated += duration - transition_secs;
    }
    offsets
}

/// Total output length after chaining every crossfade.
pub fn crossfaded_duration(durations: &[f64], transition_secs: f64) -> f64 {
    let joins = durations.len().saturating_sub(1) as f64;
    durations.iter().sum::<f64>() - joins * transition_secs
}

/// Build chained `xfade`/`acrossfade` graphs over inputs `0..n`.
///
/// Returns `None` for hard cuts, fewer than two clips, or a crossfade
/// shorter than one frame; those are joined with the concat demuxer instead.
pub fn transition_graph(
    durations: &[f64],
    transition: Transition,
    transition_secs: f64,
) -> Option<FilterGraph> {
    let name = transition.xfade_name()?;
    let n = durations.len();
    if n < 2 || transition_secs.is_nan() || transition_secs < MIN_TRANSITION_SECS {
        return None;
    }

    let offsets = xfade_offsets(durations, transition_secs);
    let mut stages = Vec::with_capacity(2 * (n - 1));

    for (k, offset) in (1..n).zip(&offsets) {
        let prev = if k == 1 { "0:v".to_string() } else { format!("v{}", k - 1) };
        let out = if k == n - 1 { VIDEO_OUT.to_string() } else { format!("v{k}") };
        stages.push(format!(
            "[{prev}][{k}:v]xfade=transition={name}:duration={}:offset={}[{out}]",
            num(transition_secs),
            num(*offset)
        ));
    }

    for k in 1..n {
        let prev = if k == 1 { "0:a".to_string() } else { format!("a{}", k - 1) };
        let out = if k == n - 1 { AUDIO_OUT.to_string() } else { format!("a{k}") };
        stages.push(format!(
            "[{prev}][{k}:a]acrossfade=d={}[{out}]",
            num(transition_secs)
        ));
    }

    Some(
        FilterGraph::new(stages.join(";"))
            .with_video(VIDEO_OUT)
            .with_audio(AUDIO_OUT),
    )
}

/// Concat demuxer list file contents for `paths`.
pub fn concat_list(paths: &[impl AsRef<Path>]) -> String {
    paths
        .iter()
        .map(|p| {
            let escaped = p.as_ref().to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}
