//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use reelkit_models::encoding::NORMALIZED_FPS;

use crate::command::{ProcessRunner, STDERR_TAIL_CHARS};
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container reports none or garbage.
pub const FALLBACK_FPS: f64 = NORMALIZED_FPS as f64;

/// Media file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels, 0 without a video stream
    pub width: u32,
    /// Height in pixels, 0 without a video stream
    pub height: u32,
    pub has_audio: bool,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    pub audio_sample_rate: Option<u32>,
    pub audio_codec: Option<String>,
}

impl ProbeResult {
    pub fn has_video(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn is_vertical(&self) -> bool {
        self.height > self.width
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
}

/// Probe a media file.
pub async fn probe(
    ffprobe: &Path,
    runner: &ProcessRunner,
    path: &Path,
    timeout: Duration,
) -> MediaResult<ProbeResult> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = runner.run(ffprobe, &args, timeout, "probe").await?;
    if !output.success() {
        return Err(MediaError::probe_failed(path, output.stderr_tail(STDERR_TAIL_CHARS)));
    }

    parse_probe_output(output.stdout.as_bytes(), path)
}

/// Parse `ffprobe -print_format json` output.
pub fn parse_probe_output(json: &[u8], path: &Path) -> MediaResult<ProbeResult> {
    let probe: FfprobeOutput = serde_json::from_slice(json)
        .map_err(|e| MediaError::probe_failed(path, format!("unparseable ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    if video.is_none() && audio.is_none() {
        return Err(MediaError::probe_failed(path, "no audio or video streams"));
    }

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| video.and_then(|v| parse_seconds(v.duration.as_deref())))
        .or_else(|| audio.and_then(|a| parse_seconds(a.duration.as_deref())))
        .unwrap_or(0.0);

    let fps = match video {
        Some(v) => {
            let reported = v
                .avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| v.r_frame_rate.as_deref().and_then(parse_frame_rate));
            match reported {
                Some(fps) => fps,
                None => {
                    warn!(
                        path = %path.display(),
                        avg = ?v.avg_frame_rate,
                        r = ?v.r_frame_rate,
                        "Unusable frame rate, assuming {} fps",
                        FALLBACK_FPS
                    );
                    FALLBACK_FPS
                }
            }
        }
        None => FALLBACK_FPS,
    };

    Ok(ProbeResult {
        duration,
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        has_audio: audio.is_some(),
        fps,
        codec: video
            .and_then(|v| v.codec_name.clone())
            .unwrap_or_default(),
        audio_sample_rate: audio
            .and_then(|a| a.sample_rate.as_deref())
            .and_then(|s| s.parse().ok()),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
    })
}

fn parse_seconds(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
///
/// Returns `None` for zero denominators, zero rates and malformed input.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let fps = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        s.trim().parse().ok()?
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920,
             "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001", "duration": "12.000"},
            {"codec_type": "audio", "codec_name": "aac", "sample_rate": "48000"}
        ],
        "format": {"duration": "12.345"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let info = parse_probe_output(SAMPLE.as_bytes(), Path::new("clip.mp4")).unwrap();
        assert!((info.duration - 12.345).abs() < 1e-9);
        assert_eq!((info.width, info.height), (1080, 1920));
        assert!(info.is_vertical());
        assert!(info.has_audio);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.codec, "h264");
        assert_eq!(info.audio_sample_rate, Some(48000));
        assert_eq!(info.audio_codec.as_deref(), Some("aac"));
    }

    #[test]
    fn test_duration_falls_back_to_stream() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360,
            "avg_frame_rate": "0/0", "r_frame_rate": "25/1", "duration": "7.5"}],
            "format": {}}"#;
        let info = parse_probe_output(json.as_bytes(), Path::new("a.mp4")).unwrap();
        assert_eq!(info.duration, 7.5);
        assert_eq!(info.fps, 25.0);
        assert!(!info.has_audio);
        assert_eq!(info.audio_sample_rate, None);
    }

    #[test]
    fn test_malformed_frame_rate_uses_fallback() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360,
            "avg_frame_rate": "0/0", "r_frame_rate": "1/0"}], "format": {"duration": "3"}}"#;
        let info = parse_probe_output(json.as_bytes(), Path::new("a.mp4")).unwrap();
        assert_eq!(info.fps, FALLBACK_FPS);
    }

    #[test]
    fn test_unparseable_output() {
        let err = parse_probe_output(b"not json", Path::new("a.mp4")).unwrap_err();
        assert_eq!(err.code(), "PROBE_FAILED");

        let err = parse_probe_output(br#"{"streams": []}"#, Path::new("a.mp4")).unwrap_err();
        assert!(matches!(err, MediaError::ProbeFailed { .. }));
    }
}
