//! Burned-in text: single overlays, caption lists and title cards.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

use reelkit_models::{
    CaptionsRequest, OperationDetails, OperationResult, Quality, TextOverlayRequest, TextStyle,
    TimeSpec, TitleCardRequest,
};

use super::MediaService;
use crate::command::FfmpegCommand;
use crate::download::validate_url;
use crate::error::{MediaError, MediaResult};
use crate::filters::scale::even_floor;
use crate::filters::text::{drawtext_chain, DrawText};
use crate::filters::title_card::{title_card_graph, TitleCardLayout};
use crate::probe::ProbeResult;
use crate::workspace::JobWorkspace;

/// Accept color names (`white`), `#RRGGBB[AA]` and `0xRRGGBB[AA]`.
pub fn validate_color(color: &str) -> MediaResult<()> {
    let hex = color
        .strip_prefix('#')
        .or_else(|| color.strip_prefix("0x"))
        .or_else(|| color.strip_prefix("0X"));
    let valid = match hex {
        Some(digits) => {
            matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => {
            !color.is_empty() && color.len() <= 32 && color.chars().all(|c| c.is_ascii_alphabetic())
        }
    };
    if valid {
        Ok(())
    } else {
        Err(MediaError::invalid_parameter(format!("unsupported color: {color:?}")))
    }
}

fn validate_style(style: &TextStyle) -> MediaResult<()> {
    validate_color(&style.font_color)?;
    validate_color(&style.box_color)
}

/// Resolve an optional display window. `0 <= start < end` must hold for
/// whichever bounds are given.
fn display_window(
    start: Option<&TimeSpec>,
    end: Option<&TimeSpec>,
) -> MediaResult<Option<(f64, Option<f64>)>> {
    let start = start.map(TimeSpec::to_seconds).transpose()?;
    let end = end.map(TimeSpec::to_seconds).transpose()?;
    if start.is_none() && end.is_none() {
        return Ok(None);
    }

    let start_secs = start.unwrap_or(0.0);
    if start_secs < 0.0 {
        return Err(MediaError::InvalidRange {
            start_secs,
            end_secs: end.unwrap_or(f64::INFINITY),
        });
    }
    if let Some(end_secs) = end {
        if start_secs >= end_secs {
            return Err(MediaError::InvalidRange { start_secs, end_secs });
        }
    }
    Ok(Some((start_secs, end)))
}

/// Fit a window to the clip: an open end runs to the end of the clip.
/// Returns `None` when the window starts after the clip ends.
fn clip_window(start: f64, end: Option<f64>, duration: f64) -> Option<(f64, f64)> {
    let end = end.unwrap_or(duration).min(duration);
    (start < end).then_some((start, end))
}

impl MediaService {
    fn font_file(&self) -> Option<String> {
        self.config
            .font_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
    }

    /// Encode `input` with `chain` as the only video filter. Audio is copied.
    async fn burn_in(
        &self,
        ws: &JobWorkspace,
        info: &ProbeResult,
        input: &Path,
        chain: String,
        quality: Quality,
        operation: &str,
    ) -> MediaResult<PathBuf> {
        let output = ws.output_path("mp4");
        let cmd = FfmpegCommand::new(&output)
            .input(input)
            .video_filter(chain)
            .video_encoding(&self.encoding(quality));
        let cmd = if info.has_audio { cmd.audio_codec("copy") } else { cmd.no_audio() };
        self.ffmpeg(&cmd.faststart(), self.config.quick_timeout, operation)
            .await?;
        Ok(output)
    }

    /// Burn one text overlay into a video.
    pub async fn add_text(&self, request: &TextOverlayRequest) -> MediaResult<OperationResult> {
        self.instrument("text_overlay", async {
            request.validate()?;
            validate_style(&request.style)?;
            let window = display_window(request.start.as_ref(), request.end.as_ref())?;
            validate_url(&request.url)?;
            let ws = self.workspace("text")?;
            let result = self.add_text_in(&ws, request, window).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn add_text_in(
        &self,
        ws: &JobWorkspace,
        request: &TextOverlayRequest,
        window: Option<(f64, Option<f64>)>,
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe_video(&input).await?;

        let font = self.font_file();
        let mut overlay = DrawText::new(&request.text, request.position, &request.style)
            .default_font(font.as_deref());
        if let Some((start, end)) = window {
            let (start, end) =
                clip_window(start, end, info.duration).ok_or(MediaError::InvalidRange {
                    start_secs: start,
                    end_secs: info.duration,
                })?;
            overlay = overlay.window(start, end);
        }
        info!(
            position = %request.position,
            chars = request.text.chars().count(),
            "Adding text overlay"
        );

        let output = self
            .burn_in(ws, &info, &input, overlay.to_filter(), request.quality, "text_overlay")
            .await?;
        let details = OperationDetails::TextOverlay {
            text: request.text.clone(),
            position: request.position,
        };
        self.finish(&output, details, Vec::new()).await
    }

    /// Burn a list of time-windowed captions into a video in one pass.
    pub async fn add_captions(&self, request: &CaptionsRequest) -> MediaResult<OperationResult> {
        self.instrument("captions", async {
            request.validate()?;
            let mut windows = Vec::with_capacity(request.captions.len());
            for caption in &request.captions {
                validate_style(&caption.style)?;
                let (start, end) = display_window(Some(&caption.start), Some(&caption.end))?
                    .and_then(|(start, end)| end.map(|end| (start, end)))
                    .ok_or_else(|| MediaError::invalid_parameter("caption window is incomplete"))?;
                windows.push((start, end));
            }
            validate_url(&request.url)?;
            let ws = self.workspace("captions")?;
            let result = self.add_captions_in(&ws, request, &windows).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn add_captions_in(
        &self,
        ws: &JobWorkspace,
        request: &CaptionsRequest,
        windows: &[(f64, f64)],
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe_video(&input).await?;
        let font = self.font_file();

        let mut overlays = Vec::with_capacity(windows.len());
        for (caption, (start, end)) in request.captions.iter().zip(windows) {
            match clip_window(*start, Some(*end), info.duration) {
                Some((start, end)) => overlays.push(
                    DrawText::new(&caption.text, caption.position, &caption.style)
                        .default_font(font.as_deref())
                        .window(start, end),
                ),
                None => debug!(
                    start_secs = start,
                    duration = info.duration,
                    "Skipping caption past the end"
                ),
            }
        }
        if overlays.is_empty() {
            return Err(MediaError::invalid_parameter(format!(
                "no caption starts within the {:.2}s clip",
                info.duration
            )));
        }

        let caption_count = overlays.len();
        info!(captions = caption_count, "Adding captions");
        let output = self
            .burn_in(ws, &info, &input, drawtext_chain(overlays), request.quality, "captions")
            .await?;
        self.finish(&output, OperationDetails::Captions { caption_count }, Vec::new())
            .await
    }

    /// Put a solid-color title card before or after a video.
    pub async fn add_title_card(&self, request: &TitleCardRequest) -> MediaResult<OperationResult> {
        self.instrument("title_card", async {
            request.validate()?;
            validate_color(&request.background_color)?;
            validate_color(&request.text_color)?;
            validate_url(&request.url)?;
            let ws = self.workspace("title-card")?;
            let result = self.add_title_card_in(&ws, request).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn add_title_card_in(
        &self,
        ws: &JobWorkspace,
        request: &TitleCardRequest,
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe_video(&input).await?;
        let font = self.font_file();

        let layout = TitleCardLayout {
            title: &request.title,
            subtitle: request.subtitle.as_deref(),
            duration: request.duration_secs,
            position: request.position,
            background_color: &request.background_color,
            text_color: &request.text_color,
            title_font_size: request.title_font_size,
            subtitle_font_size: request.subtitle_font_size,
            font_file: font.as_deref(),
            width: even_floor(info.width as f64),
            height: even_floor(info.height as f64),
            fps: info.fps.round().clamp(1.0, 120.0) as u32,
            source_width: info.width,
            source_height: info.height,
            source_duration: info.duration,
            source_has_audio: info.has_audio,
        };
        let graph = title_card_graph(&layout);
        info!(
            position = %request.position,
            card_secs = request.duration_secs,
            total_secs = layout.total_duration(),
            "Adding title card"
        );

        let output = ws.output_path("mp4");
        let cmd = graph.map_specs().into_iter().fold(
            FfmpegCommand::new(&output)
                .input(&input)
                .lavfi(layout.color_source())
                .lavfi(layout.silence_source())
                .filter_complex(graph.graph.clone()),
            |cmd, spec| cmd.map(spec),
        );
        let cmd = cmd.encoding(&self.encoding(request.quality)).faststart();
        self.ffmpeg(&cmd, self.config.long_timeout, "title_card").await?;

        let details = OperationDetails::TitleCard {
            title: request.title.clone(),
            position: request.position,
            card_duration_secs: request.duration_secs,
        };
        self.finish(&output, details, Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use reelkit_models::Caption;

    const URL: &str = "https://cdn.example.com/v.mp4";

    #[test]
    fn test_validate_color() {
        for ok in ["white", "Black", "#FFCC00", "#ffcc0080", "0x112233"] {
            assert!(validate_color(ok).is_ok(), "{ok}");
        }
        for bad in ["", "#FFF", "red:blue", "white@0.5", "0xZZZZZZ", "white'"] {
            assert!(validate_color(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_display_window() {
        assert_eq!(display_window(None, None).unwrap(), None);
        let start = TimeSpec::Seconds(2.0);
        let end = TimeSpec::Seconds(5.0);
        assert_eq!(display_window(Some(&start), Some(&end)).unwrap(), Some((2.0, Some(5.0))));
        assert_eq!(display_window(None, Some(&end)).unwrap(), Some((0.0, Some(5.0))));
        assert!(display_window(Some(&end), Some(&start)).is_err());
        assert!(display_window(Some(&TimeSpec::Seconds(-1.0)), None).is_err());
    }

    #[test]
    fn test_clip_window() {
        assert_eq!(clip_window(2.0, None, 10.0), Some((2.0, 10.0)));
        assert_eq!(clip_window(2.0, Some(30.0), 10.0), Some((2.0, 10.0)));
        assert_eq!(clip_window(12.0, Some(30.0), 10.0), None);
    }

    #[tokio::test]
    async fn test_text_rejects_empty_text_before_download() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let err = service
            .add_text(&TextOverlayRequest::new(URL, ""))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
        assert_untouched(root.path(), &fetcher);
    }

    #[tokio::test]
    async fn test_captions_reject_inverted_window() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let request = CaptionsRequest {
            url: URL.to_string(),
            captions: vec![Caption {
                text: "hello".to_string(),
                start: TimeSpec::Seconds(4.0),
                end: TimeSpec::Seconds(1.0),
                position: Default::default(),
                style: TextStyle::default(),
            }],
            quality: Default::default(),
        };
        let err = service.add_captions(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidRange { .. }));
        assert_untouched(root.path(), &fetcher);
    }

    #[tokio::test]
    async fn test_title_card_rejects_long_card() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let mut request = TitleCardRequest::new(URL, "Intro");
        request.duration_secs = 12.0;
        let err = service.add_title_card(&request).await.unwrap_err();
        assert!(err.is_validation());
        assert_untouched(root.path(), &fetcher);
    }
}
