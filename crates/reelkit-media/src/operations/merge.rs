//! Multi-clip merge with optional crossfades.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use validator::Validate;

use reelkit_models::encoding::{DEFAULT_AUDIO_SAMPLE_RATE, NORMALIZED_FPS};
use reelkit_models::result::WARNING_TRANSITION_DROPPED;
use reelkit_models::{
    EncodingConfig, MergeRequest, OperationDetails, OperationResult, ResolutionTier,
};

use super::MediaService;
use crate::command::FfmpegCommand;
use crate::download::validate_url;
use crate::error::{MediaError, MediaResult};
use crate::filters::audio::{normalize_audio_chain, silent_track};
use crate::filters::scale::{even_floor, normalize_video_chain};
use crate::filters::transition::{clamp_transition_duration, concat_list, transition_graph};
use crate::filters::FilterGraph;
use crate::metrics;
use crate::probe::ProbeResult;
use crate::workspace::JobWorkspace;

/// Output frame shared by every normalized clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeGeometry {
    pub width: u32,
    pub height: u32,
    pub is_vertical: bool,
}

/// Fail when the combined clip length is over `limit_secs`. Exactly the
/// limit is allowed.
pub fn check_duration_limit(total_secs: f64, limit_secs: f64) -> MediaResult<()> {
    if total_secs > limit_secs {
        return Err(MediaError::DurationLimitExceeded {
            total_secs,
            limit_secs,
        });
    }
    Ok(())
}

/// Pick the output frame for a merge.
///
/// Orientation is a majority vote over the clips, ties going to landscape.
/// The first clip with the winning orientation is the reference; `tier`
/// caps its short side without ever upscaling.
pub fn plan_merge_geometry(probes: &[ProbeResult], tier: ResolutionTier) -> MergeGeometry {
    let vertical = probes.iter().filter(|p| p.is_vertical()).count();
    let is_vertical = vertical * 2 > probes.len();

    let reference = probes
        .iter()
        .find(|p| p.is_vertical() == is_vertical)
        .or_else(|| probes.first());
    let (width, height) = reference
        .map(|p| (p.width.max(2), p.height.max(2)))
        .unwrap_or((1920, 1080));

    let short_side = width.min(height);
    let scale = match tier.short_side_cap() {
        Some(cap) if cap < short_side => cap as f64 / short_side as f64,
        _ => 1.0,
    };

    MergeGeometry {
        width: even_floor(width as f64 * scale),
        height: even_floor(height as f64 * scale),
        is_vertical,
    }
}

fn validate_merge(request: &MergeRequest, max_clips: usize) -> MediaResult<()> {
    let count = request.urls.len();
    if count < 2 {
        return Err(MediaError::InsufficientClips { count });
    }
    if count > max_clips {
        return Err(MediaError::invalid_parameter(format!(
            "at most {max_clips} clips can be merged, got {count}"
        )));
    }
    request.validate()?;
    for url in &request.urls {
        validate_url(url)?;
    }
    Ok(())
}

/// Re-encode one clip to the shared frame, rate, pixel format and audio layout.
fn normalize_command(
    input: &Path,
    info: &ProbeResult,
    geometry: &MergeGeometry,
    encoding: &EncodingConfig,
    output: &Path,
) -> FfmpegCommand {
    let video = normalize_video_chain(
        info.width,
        info.height,
        geometry.width,
        geometry.height,
        NORMALIZED_FPS,
    );
    let audio = if info.has_audio {
        format!("[0:a]{}", normalize_audio_chain())
    } else {
        silent_track(info.duration)
    };
    let graph = FilterGraph::new(format!("[0:v]{video}[v];{audio}[a]"))
        .with_video("v")
        .with_audio("a");

    let mut cmd = FfmpegCommand::new(output)
        .input(input)
        .filter_complex(graph.graph.clone());
    for spec in graph.map_specs() {
        cmd = cmd.map(spec);
    }
    cmd.encoding(encoding)
        .output_arg("-ar")
        .output_arg(DEFAULT_AUDIO_SAMPLE_RATE.to_string())
        .output_args(["-ac", "2"])
        .faststart()
}

fn transition_command(
    clips: &[PathBuf],
    graph: &FilterGraph,
    encoding: &EncodingConfig,
    output: &Path,
) -> FfmpegCommand {
    let mut cmd = clips
        .iter()
        .fold(FfmpegCommand::new(output), |cmd, clip| cmd.input(clip))
        .filter_complex(graph.graph.clone());
    for spec in graph.map_specs() {
        cmd = cmd.map(spec);
    }
    cmd.encoding(encoding).faststart()
}

impl MediaService {
    /// Merge two or more clips into one video.
    pub async fn merge(&self, request: &MergeRequest) -> MediaResult<OperationResult> {
        self.instrument("merge", async {
            validate_merge(request, self.config.max_clips)?;
            let ws = self.workspace("merge")?;
            let result = self.merge_in(&ws, request).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn merge_in(
        &self,
        ws: &JobWorkspace,
        request: &MergeRequest,
    ) -> MediaResult<OperationResult> {
        let sources: Vec<(&str, &str)> = request.urls.iter().map(|u| (u.as_str(), "mp4")).collect();
        let inputs = self.download_all(ws, &sources).await?;

        let mut probes = Vec::with_capacity(inputs.len());
        for input in &inputs {
            probes.push(self.probe_video(input).await?);
        }

        let total: f64 = probes.iter().map(|p| p.duration).sum();
        check_duration_limit(total, self.config.max_merge_secs)?;

        let geometry = plan_merge_geometry(&probes, request.resolution);
        info!(
            clips = inputs.len(),
            total_secs = total,
            width = geometry.width,
            height = geometry.height,
            is_vertical = geometry.is_vertical,
            "Planned merge"
        );

        let encoding = self.encoding(request.quality);
        let mut normalized = Vec::with_capacity(inputs.len());
        let mut durations = Vec::with_capacity(inputs.len());
        for (i, (input, info)) in inputs.iter().zip(&probes).enumerate() {
            let out = ws.normalized_path(i);
            let cmd = normalize_command(input, info, &geometry, &encoding, &out);
            self.ffmpeg(&cmd, self.config.long_timeout, "merge_normalize").await?;
            durations.push(self.probe(&out).await?.duration);
            normalized.push(out);
        }

        let output = ws.output_path("mp4");
        let mut warnings = Vec::new();
        let transition_secs = clamp_transition_duration(request.transition_duration, &durations);

        let transition_applied =
            match transition_graph(&durations, request.transition, transition_secs) {
                Some(graph) => {
                    let cmd = transition_command(&normalized, &graph, &encoding, &output);
                    match self.ffmpeg(&cmd, self.config.long_timeout, "merge_transition").await {
                        Ok(()) => true,
                        Err(e @ MediaError::EngineExecutionFailed { .. }) => {
                            warn!(
                                transition = %request.transition,
                                error = %e,
                                "Transition failed, joining with hard cuts"
                            );
                            metrics::record_fallback("merge", "concat");
                            warnings.push(WARNING_TRANSITION_DROPPED.to_string());
                            self.concat(ws, &normalized, &output).await?;
                            false
                        }
                        Err(e) => return Err(e),
                    }
                }
                None if request.transition.xfade_name().is_some() => {
                    warn!(
                        transition = %request.transition,
                        transition_secs,
                        "Transition too short to render, joining with hard cuts"
                    );
                    warnings.push(WARNING_TRANSITION_DROPPED.to_string());
                    self.concat(ws, &normalized, &output).await?;
                    false
                }
                None => {
                    self.concat(ws, &normalized, &output).await?;
                    false
                }
            };

        let details = OperationDetails::Merge {
            clip_count: inputs.len(),
            is_vertical: geometry.is_vertical,
            transition: request.transition,
            transition_applied,
        };
        self.finish(&output, details, warnings).await
    }

    /// Stream-copy concatenation through the concat demuxer.
    async fn concat(&self, ws: &JobWorkspace, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        let list = ws.file("concat.txt");
        tokio::fs::write(&list, concat_list(clips)).await?;

        let cmd = FfmpegCommand::new(output)
            .input_with_args(["-f", "concat", "-safe", "0"], list.to_string_lossy())
            .codec_copy()
            .faststart();
        self.ffmpeg(&cmd, self.config.long_timeout, "merge_concat").await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use reelkit_models::Transition;

    fn clip(width: u32, height: u32) -> ProbeResult {
        ProbeResult {
            duration: 10.0,
            width,
            height,
            has_audio: true,
            fps: 30.0,
            codec: "h264".to_string(),
            audio_sample_rate: Some(44100),
            audio_codec: Some("aac".to_string()),
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://cdn.example.com/{i}.mp4")).collect()
    }

    #[test]
    fn test_duration_limit_boundary() {
        assert!(check_duration_limit(480.0, 480.0).is_ok());
        let err = check_duration_limit(480.01, 480.0).unwrap_err();
        assert_eq!(err.code(), "DURATION_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_geometry_majority_vertical() {
        let probes = [clip(1920, 1080), clip(1080, 1920), clip(720, 1280)];
        let g = plan_merge_geometry(&probes, ResolutionTier::Original);
        assert!(g.is_vertical);
        assert_eq!((g.width, g.height), (1080, 1920));
    }

    #[test]
    fn test_geometry_tie_is_landscape() {
        let probes = [clip(1080, 1920), clip(1280, 720)];
        let g = plan_merge_geometry(&probes, ResolutionTier::Original);
        assert!(!g.is_vertical);
        assert_eq!((g.width, g.height), (1280, 720));
    }

    #[test]
    fn test_geometry_tier_caps_short_side() {
        let probes = [clip(1080, 1920), clip(1080, 1920)];
        let g = plan_merge_geometry(&probes, ResolutionTier::Hd720);
        assert_eq!((g.width, g.height), (720, 1280));

        // Never upscales
        let small = [clip(640, 360), clip(640, 360)];
        let g = plan_merge_geometry(&small, ResolutionTier::Hd1080);
        assert_eq!((g.width, g.height), (640, 360));
    }

    #[test]
    fn test_geometry_even_dimensions() {
        let probes = [clip(1001, 563), clip(1001, 563)];
        let g = plan_merge_geometry(&probes, ResolutionTier::Original);
        assert_eq!((g.width, g.height), (1000, 562));
    }

    #[test]
    fn test_normalize_command_injects_silence() {
        let geometry = MergeGeometry {
            width: 1080,
            height: 1920,
            is_vertical: true,
        };
        let mut silent = clip(1080, 1920);
        silent.has_audio = false;
        let args = normalize_command(
            Path::new("/w/input-0.mp4"),
            &silent,
            &geometry,
            &EncodingConfig::default(),
            Path::new("/w/normalized-0.mp4"),
        )
        .build_args();
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.starts_with("[0:v]scale=1080:1920,setsar=1,fps=30,format=yuv420p[v];"));
        assert!(graph.contains("anullsrc="));
        assert!(!graph.contains("[0:a]"));
        assert!(args.windows(2).any(|w| w == ["-ar", "44100"]));
    }

    #[tokio::test]
    async fn test_merge_rejects_single_clip_before_download() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let err = service.merge(&MergeRequest::new(urls(1))).await.unwrap_err();
        assert!(matches!(err, MediaError::InsufficientClips { count: 1 }));
        assert_untouched(root.path(), &fetcher);
    }

    #[tokio::test]
    async fn test_merge_rejects_too_many_clips() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let err = service.merge(&MergeRequest::new(urls(21))).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
        assert_untouched(root.path(), &fetcher);
    }

    #[tokio::test]
    async fn test_merge_rejects_bad_url() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let request = MergeRequest::new(vec!["https://a/1.mp4".into(), "ftp://a/2.mp4".into()]);
        let err = service.merge(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidUrl(_)));
        assert_untouched(root.path(), &fetcher);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_transition_falls_back_to_concat() {
        let root = tempfile::tempdir().unwrap();
        let engines = ScriptedEngines::new("xfade=");
        let service = scripted_service(root.path(), &engines);
        let request = MergeRequest::new(urls(2)).with_transition(Transition::Fade, 0.5);

        let result = service.merge(&request).await.unwrap();
        assert_eq!(result.warnings, vec![WARNING_TRANSITION_DROPPED.to_string()]);
        assert!(matches!(
            result.details,
            OperationDetails::Merge {
                clip_count: 2,
                transition_applied: false,
                ..
            }
        ));
        assert_eq!(result.buffer, b"media");

        let runs = engines.ffmpeg_runs();
        assert_eq!(runs.len(), 4, "{runs:?}");
        assert!(runs[2].contains("xfade=transition=fade:duration=0.500"));
        assert!(runs[3].contains("-f concat -safe 0"));
        assert!(runs[3].contains("-c copy"));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hard_cut_merge_has_no_warning() {
        let root = tempfile::tempdir().unwrap();
        let engines = ScriptedEngines::new("xfade=");
        let service = scripted_service(root.path(), &engines);

        let result = service.merge(&MergeRequest::new(urls(2))).await.unwrap();
        assert!(result.warnings.is_empty());
        let runs = engines.ffmpeg_runs();
        assert_eq!(runs.len(), 3, "{runs:?}");
        assert!(!runs.iter().any(|r| r.contains("xfade=")));
    }
}
