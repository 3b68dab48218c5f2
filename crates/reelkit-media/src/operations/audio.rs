//! Replace, mix or mute a video's audio.

use std::path::Path;
use tracing::info;
use validator::Validate;

use reelkit_models::{
    AudioRemixRequest, EncodingConfig, OperationDetails, OperationResult, RemixShape,
};

use super::MediaService;
use crate::command::FfmpegCommand;
use crate::download::validate_url;
use crate::error::MediaResult;
use crate::filters::audio::remix_graph;
use crate::workspace::JobWorkspace;

/// Remix command: video copied from input 0, music (if any) looped from
/// input 1, audio taken from the remix graph.
fn remix_command(
    video: &Path,
    music: Option<&Path>,
    output: &Path,
    graph: &str,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output).input(video);
    let cmd = match music {
        Some(music) => cmd.input_with_args(["-stream_loop", "-1"], music.to_string_lossy()),
        None => cmd,
    };
    cmd.filter_complex(graph)
        .map("0:v:0")
        .map("[aout]")
        .video_codec("copy")
        .output_args(encoding.audio_args())
        .shortest()
        .faststart()
}

impl MediaService {
    /// Mix, replace or mute the audio of a video.
    pub async fn remix_audio(&self, request: &AudioRemixRequest) -> MediaResult<OperationResult> {
        self.instrument("audio_remix", async {
            request.validate()?;
            validate_url(&request.video_url)?;
            if let Some(music) = &request.music_url {
                validate_url(music)?;
            }
            let ws = self.workspace("remix")?;
            let result = self.remix_in(&ws, request).await;
            ws.cleanup();
            result
        })
        .await
    }

    async fn remix_in(
        &self,
        ws: &JobWorkspace,
        request: &AudioRemixRequest,
    ) -> MediaResult<OperationResult> {
        let mut sources = vec![(request.video_url.as_str(), "mp4")];
        if let Some(music) = &request.music_url {
            sources.push((music.as_str(), "m4a"));
        }
        let inputs = self.download_all(ws, &sources).await?;
        let video = &inputs[0];
        let music = inputs.get(1);

        let info = self.probe_video(video).await?;
        if let Some(music) = music {
            // Rejects music files without a readable stream before the encode
            self.probe(music).await?;
        }

        let shape = RemixShape::select(music.is_some(), info.has_audio && !request.mute_original);
        let graph = remix_graph(
            shape,
            request.original_volume,
            request.music_volume,
            info.duration,
        );
        info!(
            shape = %shape,
            original_volume = request.original_volume,
            music_volume = request.music_volume,
            "Remixing audio"
        );

        let output = ws.output_path("mp4");
        let cmd = remix_command(
            video,
            music.map(|p| p.as_path()),
            &output,
            &graph.graph,
            &self.encoding(Default::default()),
        );
        self.ffmpeg(&cmd, self.config.quick_timeout, "audio_remix").await?;

        self.finish(&output, OperationDetails::AudioRemix { shape }, Vec::new())
            .await
    }
}
