//! Solid-color title cards joined to a source clip.
//!
//! Inputs: `0` is the source clip, `1` the `color` source from
//! [`TitleCardLayout::color_source`], `2` the silence from
//! [`TitleCardLayout::silence_source`].

use reelkit_models::encoding::{DEFAULT_AUDIO_SAMPLE_RATE, DEFAULT_PIXEL_FORMAT};
use reelkit_models::{CardPosition, TextPosition, TextStyle};

use super::audio::{normalize_audio_chain, silent_track};
use super::scale::normalize_video_chain;
use super::text::DrawText;
use super::{escape_filter_value, num, FilterGraph};

/// Longest fade applied to either end of the card.
const MAX_FADE_SECS: f64 = 0.5;

/// Everything needed to lay out a title card next to a source clip.
#[derive(Debug, Clone)]
pub struct TitleCardLayout<'a> {
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    pub duration: f64,
    pub position: CardPosition,
    pub background_color: &'a str,
    pub text_color: &'a str,
    pub title_font_size: u32,
    pub subtitle_font_size: u32,
    pub font_file: Option<&'a str>,
    /// Output frame size; the card is rendered at this size.
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub source_duration: f64,
    pub source_has_audio: bool,
}

impl TitleCardLayout<'_> {
    /// Fade length: a quarter of the card, at most half a second.
    pub fn fade_secs(&self) -> f64 {
        (self.duration / 4.0).min(MAX_FADE_SECS)
    }

    /// `lavfi` expression for the card background.
    pub fn color_source(&self) -> String {
        format!(
            "color=c={}:s={}x{}:r={}:d={}",
            escape_filter_value(self.background_color),
            self.width,
            self.height,
            self.fps,
            num(self.duration)
        )
    }

    /// `lavfi` expression for the card's silent audio.
    pub fn silence_source(&self) -> String {
        format!("anullsrc=channel_layout=stereo:sample_rate={DEFAULT_AUDIO_SAMPLE_RATE}")
    }

    pub fn total_duration(&self) -> f64 {
        self.duration + self.source_duration
    }

    fn text_style(&self, font_size: u32) -> TextStyle {
        TextStyle {
            font_size,
            font_color: self.text_color.to_string(),
            font_file: self.font_file.map(str::to_string),
            ..TextStyle::default()
        }
    }
}

/// Build the card, normalize the source to match and concatenate the two in
/// the requested order.
pub fn title_card_graph(layout: &TitleCardLayout<'_>) -> FilterGraph {
    let fade = layout.fade_secs();
    let title_style = layout.text_style(layout.title_font_size);
    let subtitle_style = layout.text_style(layout.subtitle_font_size);

    let mut card = Vec::new();
    match layout.subtitle {
        Some(subtitle) => {
            card.push(
                DrawText::new(layout.title, TextPosition::Center, &title_style)
                    .at("(w-text_w)/2", "h/2-text_h-h*0.01")
                    .to_filter(),
            );
            card.push(
                DrawText::new(subtitle, TextPosition::Center, &subtitle_style)
                    .at("(w-text_w)/2", "h/2+h*0.01")
                    .to_filter(),
            );
        }
        None => {
            card.push(DrawText::new(layout.title, TextPosition::Center, &title_style).to_filter())
        }
    }
    card.push(format!("fade=t=in:st=0:d={}", num(fade)));
    card.push(format!(
        "fade=t=out:st={}:d={}",
        num((layout.duration - fade).max(0.0)),
        num(fade)
    ));
    card.push(format!("format={DEFAULT_PIXEL_FORMAT},setsar=1"));

    let main_video = normalize_video_chain(
        layout.source_width,
        layout.source_height,
        layout.width,
        layout.height,
        layout.fps,
    );
    let main_audio = if layout.source_has_audio {
        format!("[0:a]{}", normalize_audio_chain())
    } else {
        silent_track(layout.source_duration)
    };

    let order = match layout.position {
        CardPosition::Start => "[card][cardaudio][main][mainaudio]",
        CardPosition::End => "[main][mainaudio][card][cardaudio]",
    };

    let graph = [
        format!("[1:v]{}[card]", card.join(",")),
        format!(
            "[2:a]atrim=0:{},asetpts=PTS-STARTPTS,{}[cardaudio]",
            num(layout.duration),
            normalize_audio_chain()
        ),
        format!("[0:v]{main_video}[main]"),
        format!("{main_audio}[mainaudio]"),
        format!("{order}concat=n=2:v=1:a=1[vout][aout]"),
    ]
    .join(";");

    FilterGraph::new(graph).with_video("vout").with_audio("aout")
}
