//! `drawtext` overlays.
//!
//! User text passes through three parsers before it is drawn: drawtext's own
//! `%{...}` expansion, the filter option parser and the filtergraph parser.
//! Each level gets its own escaping pass, applied innermost first.

use reelkit_models::{TextPosition, TextStyle};

use super::{escape_filter_value, escape_graph_level, escape_option_level, num, unescape_level};

/// Distance from the frame edge, as a fraction of the frame size.
const EDGE_MARGIN: f64 = 0.05;

/// Escape literal text for drawtext's `text` option inside a filtergraph.
pub fn escape_drawtext_text(raw: &str) -> String {
    let expansion = raw.replace('\\', r"\\").replace('%', r"\%");
    escape_graph_level(&escape_option_level(&expansion))
}

/// Inverse of [`escape_drawtext_text`].
pub fn unescape_drawtext_text(escaped: &str) -> String {
    unescape_level(&unescape_level(&unescape_level(escaped)))
}

/// `x`/`y` expressions for a nine-point position.
pub fn position_expr(position: TextPosition) -> (String, String) {
    let left = format!("w*{EDGE_MARGIN}");
    let center_x = "(w-text_w)/2".to_string();
    let right = format!("w-text_w-w*{EDGE_MARGIN}");
    let top = format!("h*{EDGE_MARGIN}");
    let center_y = "(h-text_h)/2".to_string();
    let bottom = format!("h-text_h-h*{EDGE_MARGIN}");

    match position {
        TextPosition::TopLeft => (left, top),
        TextPosition::TopCenter => (center_x, top),
        TextPosition::TopRight => (right, top),
        TextPosition::CenterLeft => (left, center_y),
        TextPosition::Center => (center_x, center_y),
        TextPosition::CenterRight => (right, center_y),
        TextPosition::BottomLeft => (left, bottom),
        TextPosition::BottomCenter => (center_x, bottom),
        TextPosition::BottomRight => (right, bottom),
    }
}

/// One drawtext filter.
#[derive(Debug, Clone)]
pub struct DrawText<'a> {
    text: &'a str,
    style: &'a TextStyle,
    x: String,
    y: String,
    window: Option<(f64, f64)>,
    font_file: Option<&'a str>,
}

impl<'a> DrawText<'a> {
    pub fn new(text: &'a str, position: TextPosition, style: &'a TextStyle) -> Self {
        let (x, y) = position_expr(position);
        Self {
            text,
            style,
            x,
            y,
            window: None,
            font_file: style.font_file.as_deref(),
        }
    }

    /// Override the position with explicit expressions.
    pub fn at(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x = x.into();
        self.y = y.into();
        self
    }

    /// Only draw between `start` and `end` seconds.
    pub fn window(mut self, start: f64, end: f64) -> Self {
        self.window = Some((start, end));
        self
    }

    /// Font used when the style names none.
    pub fn default_font(mut self, font_file: Option<&'a str>) -> Self {
        if self.font_file.is_none() {
            self.font_file = font_file;
        }
        self
    }

    pub fn to_filter(&self) -> String {
        let style = self.style;
        let mut opts = Vec::with_capacity(10);

        if let Some(font) = self.font_file {
            opts.push(format!("fontfile={}", escape_filter_value(font)));
        }
        opts.push(format!("text={}", escape_drawtext_text(self.text)));
        opts.push(format!("fontsize={}", style.font_size));
        opts.push(format!("fontcolor={}", escape_filter_value(&style.font_color)));
        opts.push(format!("x={}", self.x));
        opts.push(format!("y={}", self.y));

        if style.background_box {
            opts.push("box=1".to_string());
            opts.push(format!(
                "boxcolor={}@{:.2}",
                escape_filter_value(&style.box_color),
                style.box_opacity
            ));
            opts.push(format!("boxborderw={}", (style.font_size / 4).max(4)));
        }
        if style.border_width > 0 {
            opts.push(format!("borderw={}", style.border_width));
            opts.push("bordercolor=black".to_string());
        }
        if let Some((start, end)) = self.window {
            opts.push(format!("enable='between(t,{},{})'", num(start), num(end)));
        }

        format!("drawtext={}", opts.join(":"))
    }
}

/// Join several drawtext filters into one chain.
pub fn drawtext_chain<'a>(overlays: impl IntoIterator<Item = DrawText<'a>>) -> String {
    overlays
        .into_iter()
        .map(|d| d.to_filter())
        .collect::<Vec<_>>()
        .join(",")
}
