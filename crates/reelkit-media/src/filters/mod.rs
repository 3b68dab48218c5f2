//! Filter-graph builders.
//!
//! Everything in here is a pure function of its inputs: the same arguments
//! always produce the same filter string, and nothing touches the engine.

pub mod audio;
pub mod scale;
pub mod text;
pub mod timing;
pub mod title_card;
pub mod transition;

pub use audio::{atempo_chain, remix_graph, silent_track};
pub use scale::{planned_geometry, round_even, scale_filter, PlannedGeometry};
pub use text::{escape_drawtext_text, DrawText};
pub use timing::{reverse_graph, speed_graph};
pub use title_card::{title_card_graph, TitleCardLayout};
pub use transition::{transition_graph, xfade_offsets};

/// A `-filter_complex` graph and the labels of its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    pub graph: String,
    /// Final video label without brackets, if the graph produces video.
    pub video_label: Option<String>,
    /// Final audio label without brackets, if the graph produces audio.
    pub audio_label: Option<String>,
}

impl FilterGraph {
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            video_label: None,
            audio_label: None,
        }
    }

    pub fn with_video(mut self, label: impl Into<String>) -> Self {
        self.video_label = Some(label.into());
        self
    }

    pub fn with_audio(mut self, label: impl Into<String>) -> Self {
        self.audio_label = Some(label.into());
        self
    }

    /// `-map` specifiers for the graph outputs, video first.
    pub fn map_specs(&self) -> Vec<String> {
        self.video_label
            .iter()
            .chain(self.audio_label.iter())
            .map(|label| format!("[{label}]"))
            .collect()
    }
}

/// Format a number for filter arguments with fixed precision.
pub(crate) fn num(value: f64) -> String {
    format!("{:.3}", value)
}

/// Format a number with up to six decimals and no trailing zeros.
pub(crate) fn short_num(value: f64) -> String {
    let s = format!("{:.6}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Backslash-escape every character of `raw` that appears in `special`.
fn escape_chars(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Undo one level of backslash escaping.
pub fn unescape_level(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Escape for a filter option value (`key=value:key=value`).
pub(crate) fn escape_option_level(raw: &str) -> String {
    escape_chars(raw, &['\\', '\'', ':'])
}

/// Escape for the filtergraph description itself.
pub(crate) fn escape_graph_level(raw: &str) -> String {
    escape_chars(raw, &['\\', '\'', '[', ']', ',', ';'])
}

/// Escape a literal (path, color) used as a filter option value inside a
/// filtergraph.
pub fn escape_filter_value(raw: &str) -> String {
    escape_graph_level(&escape_option_level(raw))
}
