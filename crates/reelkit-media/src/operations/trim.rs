//! Segment extraction.

use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

use reelkit_models::{EncodingConfig, OperationDetails, OperationResult, TrimRequest};

use super::MediaService;
use crate::command::{format_secs, FfmpegCommand};
use crate::download::validate_url;
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::workspace::JobWorkspace;

/// Resolve the requested range without knowing the source length.
pub fn requested_range(request: &TrimRequest) -> MediaResult<(f64, f64)> {
    let start = request.start.to_seconds()?;
    let end = request.end.to_seconds()?;
    if start >= end {
        return Err(MediaError::InvalidRange {
            start_secs: start,
            end_secs: end,
        });
    }
    Ok((start, end))
}

/// Clamp a range into `[0, duration]`; an empty result is an error.
pub fn clamp_range(start: f64, end: f64, duration: f64) -> MediaResult<(f64, f64)> {
    let duration = duration.max(0.0);
    let start = start.clamp(0.0, duration);
    let end = end.clamp(0.0, duration);
    if start >= end {
        return Err(MediaError::InvalidRange {
            start_secs: start,
            end_secs: end,
        });
    }
    Ok((start, end))
}

fn trim_command(
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
    encoding: Option<&EncodingConfig>,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output)
        .input_with_args(["-ss".to_string(), format_secs(start)], input.to_string_lossy())
        .duration(end - start);
    let cmd = match encoding {
        // Stream copy cuts on the nearest keyframe
        None => cmd.codec_copy().output_args(["-avoid_negative_ts", "make_zero"]),
        Some(encoding) => cmd.encoding(encoding),
    };
    cmd.faststart()
}

impl MediaService {
    /// Cut `[start, end)` out of a video.
    pub async fn trim(&self, request: &TrimRequest) -> MediaResult<OperationResult> {
        self.instrument("trim", async {
            let (start, end) = requested_range(request)?;
            request.validate()?;
            validate_url(&request.url)?;
            let ws = self.workspace("trim")?;
            let result = self.trim_in(&ws, request, start, end).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn trim_in(
        &self,
        ws: &JobWorkspace,
        request: &TrimRequest,
        start: f64,
        end: f64,
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe(&input).await?;
        let (start, end) = clamp_range(start, end, info.duration)?;
        info!(start_secs = start, end_secs = end, source_secs = info.duration, "Trimming");

        let output = ws.output_path("mp4");
        let encoding = self.encoding(request.quality);
        let timeout = self.config.quick_timeout;

        let reencoded = if request.reencode {
            let cmd = trim_command(&input, &output, start, end, Some(&encoding));
            self.ffmpeg(&cmd, timeout, "trim").await?;
            true
        } else {
            match self
                .ffmpeg(&trim_command(&input, &output, start, end, None), timeout, "trim")
                .await
            {
                Ok(()) => false,
                Err(e @ MediaError::EngineExecutionFailed { .. }) => {
                    warn!(error = %e, "Stream copy cut failed, re-encoding");
                    metrics::record_fallback("trim", "reencode");
                    self.ffmpeg(
                        &trim_command(&input, &output, start, end, Some(&encoding)),
                        timeout,
                        "trim",
                    )
                    .await?;
                    true
                }
                Err(e) => return Err(e),
            }
        };

        let details = OperationDetails::Trim {
            start_secs: start,
            end_secs: end,
            reencoded,
        };
        self.finish(&output, details, Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    const URL: &str = "https://cdn.example.com/v.mp4";

    #[test]
    fn test_requested_range() {
        assert_eq!(requested_range(&TrimRequest::new(URL, 1.5, "00:00:10")).unwrap(), (1.5, 10.0));
        let err = requested_range(&TrimRequest::new(URL, 10.0, 5.0)).unwrap_err();
        assert!(matches!(err, MediaError::InvalidRange { .. }));
        let err = requested_range(&TrimRequest::new(URL, "1:xx", 5.0)).unwrap_err();
        assert_eq!(err.code(), "INVALID_TIMESTAMP");
    }

    #[test]
    fn test_clamp_range() {
        assert_eq!(clamp_range(-5.0, 9999.0, 30.0).unwrap(), (0.0, 30.0));
        assert_eq!(clamp_range(2.0, 8.0, 30.0).unwrap(), (2.0, 8.0));
        // Entirely past the end collapses to nothing
        assert!(clamp_range(40.0, 50.0, 30.0).is_err());
    }

    #[test]
    fn test_copy_and_reencode_commands() {
        let copy = trim_command(Path::new("/w/in.mp4"), Path::new("/w/out.mp4"), 2.0, 8.0, None)
            .build_args();
        let ss = copy.iter().position(|a| a == "-ss").unwrap();
        let i = copy.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i, "seek must be an input option");
        assert!(copy.windows(2).any(|w| w == ["-t", "6.000"]));
        assert!(copy.windows(2).any(|w| w == ["-c", "copy"]));

        let encoding = EncodingConfig::default();
        let reencode = trim_command(
            Path::new("/w/in.mp4"),
            Path::new("/w/out.mp4"),
            2.0,
            8.0,
            Some(&encoding),
        )
        .build_args();
        assert!(reencode.iter().any(|a| a == "libx264"));
        assert!(!reencode.iter().any(|a| a == "copy"));
    }

    #[tokio::test]
    async fn test_trim_rejects_inverted_range_before_download() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let err = service.trim(&TrimRequest::new(URL, 10.0, 5.0)).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidRange { .. }));
        assert_untouched(root.path(), &fetcher);
    }
}
