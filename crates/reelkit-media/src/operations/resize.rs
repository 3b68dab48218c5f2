//! Platform and custom-size resizing.

use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

use reelkit_models::request::{MAX_CUSTOM_DIMENSION, MIN_CUSTOM_DIMENSION};
use reelkit_models::result::{WARNING_AUDIO_REPLACED, WARNING_TRUNCATED};
use reelkit_models::{
    find_preset, EncodingConfig, OperationDetails, OperationResult, PlatformPreset, ResizeMode,
    ResizeRequest,
};

use super::MediaService;
use crate::command::FfmpegCommand;
use crate::download::validate_url;
use crate::error::{MediaError, MediaResult};
use crate::filters::audio::silent_track;
use crate::filters::scale::{round_even, scale_filter};
use crate::metrics;
use crate::probe::ProbeResult;
use crate::workspace::JobWorkspace;

/// Where a resize is headed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeTarget {
    Preset(&'static PlatformPreset),
    Custom { width: u32, height: u32 },
}

impl ResizeTarget {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResizeTarget::Preset(p) => (p.width, p.height),
            ResizeTarget::Custom { width, height } => (*width, *height),
        }
    }

    pub fn max_duration_secs(&self) -> Option<f64> {
        match self {
            ResizeTarget::Preset(p) => p.max_duration_secs,
            ResizeTarget::Custom { .. } => None,
        }
    }

    fn preset_id(&self) -> Option<String> {
        match self {
            ResizeTarget::Preset(p) => Some(p.id.to_string()),
            ResizeTarget::Custom { .. } => None,
        }
    }
}

/// Decide the target of a resize request.
///
/// Exactly one of a preset or a full custom size must be given. Custom sizes
/// are rounded to even numbers.
pub fn resolve_target(request: &ResizeRequest) -> MediaResult<ResizeTarget> {
    match (&request.preset, request.custom_width, request.custom_height) {
        (Some(id), None, None) => find_preset(id)
            .map(ResizeTarget::Preset)
            .ok_or_else(|| MediaError::UnknownPreset(id.clone())),
        (None, Some(width), Some(height)) => {
            let range = MIN_CUSTOM_DIMENSION..=MAX_CUSTOM_DIMENSION;
            if !range.contains(&width) || !range.contains(&height) {
                return Err(MediaError::invalid_parameter(format!(
                    "custom size {width}x{height} is outside \
                     [{MIN_CUSTOM_DIMENSION}, {MAX_CUSTOM_DIMENSION}]"
                )));
            }
            Ok(ResizeTarget::Custom {
                width: round_even(width as f64),
                height: round_even(height as f64),
            })
        }
        _ => Err(MediaError::AmbiguousTarget),
    }
}

/// Encode command for a resize. `silence` replaces the source audio with a
/// synthesized track of `duration` seconds.
fn resize_command(
    input: &Path,
    output: &Path,
    video_filter: &str,
    duration: f64,
    limit: Option<f64>,
    silence: bool,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let audio = if silence {
        format!(";{}[a]", silent_track(duration))
    } else {
        String::new()
    };
    let cmd = FfmpegCommand::new(output)
        .input(input)
        .filter_complex(format!("[0:v]{video_filter}[v]{audio}"))
        .map("[v]");
    let cmd = if silence { cmd.map("[a]") } else { cmd.map("0:a:0") };
    let cmd = match limit {
        Some(secs) => cmd.duration(secs),
        None => cmd,
    };
    cmd.encoding(encoding).faststart()
}

impl MediaService {
    /// Resize a video to a platform preset or a custom size.
    pub async fn resize_for_platform(
        &self,
        request: &ResizeRequest,
    ) -> MediaResult<OperationResult> {
        self.instrument("resize", async {
            let target = resolve_target(request)?;
            request.validate()?;
            validate_url(&request.url)?;
            let ws = self.workspace("resize")?;
            let result = self.resize_in(&ws, request, target).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn resize_in(
        &self,
        ws: &JobWorkspace,
        request: &ResizeRequest,
        target: ResizeTarget,
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe_video(&input).await?;
        let (width, height) = target.dimensions();
        let filter = scale_filter(info.width, info.height, width, height, request.mode);

        let mut warnings = Vec::new();
        let limit = target
            .max_duration_secs()
            .filter(|max| info.duration > *max);
        if let Some(max) = limit {
            info!(source_secs = info.duration, limit_secs = max, "Truncating to platform limit");
            warnings.push(WARNING_TRUNCATED.to_string());
        }
        let duration = limit.unwrap_or(info.duration);

        info!(
            target_width = width,
            target_height = height,
            mode = %request.mode,
            "Resizing"
        );

        let output = ws.output_path("mp4");
        let encoding = self.encoding(request.quality);
        let encode = |silence: bool| {
            resize_command(&input, &output, &filter, duration, limit, silence, &encoding)
        };

        if info.has_audio {
            match self.ffmpeg(&encode(false), self.config.quick_timeout, "resize").await {
                Ok(()) => {}
                Err(e @ MediaError::EngineExecutionFailed { .. }) => {
                    warn!(error = %e, "Audio re-encode failed, retrying with silence");
                    metrics::record_fallback("resize", "silent_audio");
                    warnings.push(WARNING_AUDIO_REPLACED.to_string());
                    self.ffmpeg(&encode(true), self.config.quick_timeout, "resize").await?;
                }
                Err(e) => return Err(e),
            }
        } else {
            self.ffmpeg(&encode(true), self.config.quick_timeout, "resize").await?;
        }

        let details = resize_details(&target, request.mode, &info);
        self.finish(&output, details, warnings).await
    }
}

fn resize_details(target: &ResizeTarget, mode: ResizeMode, info: &ProbeResult) -> OperationDetails {
    OperationDetails::Resize {
        preset: target.preset_id(),
        mode,
        source_width: info.width,
        source_height: info.height,
    }
}
