//! Speed change and reversal.

use tracing::info;
use validator::Validate;

use reelkit_models::encoding::DEFAULT_AUDIO_SAMPLE_RATE;
use reelkit_models::request::{MAX_SPEED_FACTOR, MIN_SPEED_FACTOR};
use reelkit_models::{OperationDetails, OperationResult, ReverseRequest, SpeedRequest};

use super::MediaService;
use crate::command::FfmpegCommand;
use crate::download::validate_url;
use crate::error::{MediaError, MediaResult};
use crate::filters::timing::{reverse_graph, speed_graph};
use crate::filters::FilterGraph;
use crate::workspace::JobWorkspace;

/// Reject factors outside the supported playback range.
pub fn check_speed_factor(factor: f64) -> MediaResult<()> {
    if !factor.is_finite() || !(MIN_SPEED_FACTOR..=MAX_SPEED_FACTOR).contains(&factor) {
        return Err(MediaError::AmbiguousSpeedFactor {
            factor,
            min: MIN_SPEED_FACTOR,
            max: MAX_SPEED_FACTOR,
        });
    }
    Ok(())
}

/// Apply a graph's outputs to `cmd`, adding extra maps for streams the graph
/// does not produce.
fn map_graph(cmd: FfmpegCommand, graph: &FilterGraph) -> FfmpegCommand {
    graph
        .map_specs()
        .into_iter()
        .fold(cmd.filter_complex(graph.graph.clone()), |cmd, spec| cmd.map(spec))
}

impl MediaService {
    /// Play a video faster or slower.
    pub async fn change_speed(&self, request: &SpeedRequest) -> MediaResult<OperationResult> {
        self.instrument("speed", async {
            check_speed_factor(request.factor)?;
            request.validate()?;
            validate_url(&request.url)?;
            let ws = self.workspace("speed")?;
            let result = self.speed_in(&ws, request).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn speed_in(
        &self,
        ws: &JobWorkspace,
        request: &SpeedRequest,
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe_video(&input).await?;
        let sample_rate = info.audio_sample_rate.unwrap_or(DEFAULT_AUDIO_SAMPLE_RATE);
        let graph = speed_graph(
            request.factor,
            request.maintain_pitch,
            info.has_audio,
            sample_rate,
        );
        info!(
            factor = request.factor,
            maintain_pitch = request.maintain_pitch,
            has_audio = info.has_audio,
            "Changing speed"
        );

        let output = ws.output_path("mp4");
        let cmd = map_graph(FfmpegCommand::new(&output).input(&input), &graph);
        let cmd = if graph.audio_label.is_none() { cmd.no_audio() } else { cmd };
        let cmd = cmd.encoding(&self.encoding(request.quality)).faststart();
        self.ffmpeg(&cmd, self.config.quick_timeout, "speed").await?;

        let details = OperationDetails::Speed {
            factor: request.factor,
            maintain_pitch: request.maintain_pitch,
        };
        self.finish(&output, details, Vec::new()).await
    }

    /// Play a video backwards.
    ///
    /// The whole clip is buffered in the engine, so memory grows with length.
    pub async fn reverse(&self, request: &ReverseRequest) -> MediaResult<OperationResult> {
        self.instrument("reverse", async {
            request.validate()?;
            validate_url(&request.url)?;
            let ws = self.workspace("reverse")?;
            let result = self.reverse_in(&ws, request).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn reverse_in(
        &self,
        ws: &JobWorkspace,
        request: &ReverseRequest,
    ) -> MediaResult<OperationResult> {
        let input = self.download(ws, &request.url, 0, "mp4").await?;
        let info = self.probe_video(&input).await?;
        let graph = reverse_graph(request.reverse_audio, info.has_audio);
        let audio_reversed = graph.audio_label.is_some();

        let output = ws.output_path("mp4");
        let cmd = map_graph(FfmpegCommand::new(&output).input(&input), &graph);
        let cmd = match (audio_reversed, info.has_audio) {
            (false, true) => cmd.map("0:a:0"),
            (false, false) => cmd.no_audio(),
            (true, _) => cmd,
        };
        let cmd = cmd.encoding(&self.encoding(request.quality)).faststart();
        self.ffmpeg(&cmd, self.config.long_timeout, "reverse").await?;

        self.finish(&output, OperationDetails::Reverse { audio_reversed }, Vec::new())
            .await
    }
}
