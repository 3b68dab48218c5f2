//! FFmpeg command builder and process runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use reelkit_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// Characters of stderr kept in engine failure errors.
pub const STDERR_TAIL_CHARS: usize = 500;

/// Format seconds the way every engine argument expects them.
pub fn format_secs(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

#[derive(Debug, Clone)]
struct FfmpegInput {
    /// Arguments placed before this input's `-i`
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add a file input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(Vec::<String>::new(), path.as_ref().to_string_lossy())
    }

    /// Add an input preceded by its own arguments (`-ss`, `-stream_loop`, `-f`).
    pub fn input_with_args<I, S>(mut self, args: I, source: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            args: args.into_iter().map(Into::into).collect(),
            source: source.into(),
        });
        self
    }

    /// Add a synthesized `lavfi` input such as `color=...` or `anullsrc=...`.
    pub fn lavfi(self, expr: impl Into<String>) -> Self {
        self.input_with_args(["-f", "lavfi"], expr)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format_secs(seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream specifier or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Copy every stream without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Apply codec, preset, CRF, pixel format and audio settings.
    pub fn encoding(self, config: &EncodingConfig) -> Self {
        self.output_args(config.to_ffmpeg_args())
    }

    /// Encode video only, using the video half of `config`.
    pub fn video_encoding(self, config: &EncodingConfig) -> Self {
        self.output_args(config.video_args())
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// End the output with the shortest stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Move the index to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `max_chars` characters of stderr.
    pub fn stderr_tail(&self, max_chars: usize) -> String {
        let trimmed = self.stderr.trim_end();
        let count = trimmed.chars().count();
        if count <= max_chars {
            trimmed.to_string()
        } else {
            trimmed.chars().skip(count - max_chars).collect()
        }
    }
}

/// Runs external engine processes with a timeout and optional cancellation.
///
/// Children are spawned with `kill_on_drop`, so dropping the future returned
/// by [`ProcessRunner::run`] also terminates the process.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ProcessRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { cancel_rx: None }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// True once the cancellation signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Run `program` to completion, capturing its output.
    ///
    /// Non-zero exits are returned as a normal [`ProcessOutput`]; only
    /// spawn failures, timeouts and cancellation are errors.
    pub async fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
        operation: &str,
    ) -> MediaResult<ProcessOutput> {
        if self.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let engine = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.display().to_string());
        debug!(operation, "Running {} {}", program.display(), args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout_task = tokio::spawn(read_to_string(child.stdout.take()));
        let stderr_task = tokio::spawn(read_to_string(child.stderr.take()));

        let waited =
            tokio::time::timeout(timeout, wait_or_cancel(&mut child, self.cancel_rx.clone())).await;
        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let outcome = if matches!(e, MediaError::Cancelled) {
                    info!(operation, "{} cancelled, killing process", engine);
                    "cancelled"
                } else {
                    "failed"
                };
                let _ = child.kill().await;
                metrics::record_engine_run(&engine, outcome);
                return Err(e);
            }
            Err(_) => {
                warn!(
                    operation,
                    "{} timed out after {} seconds, killing process",
                    engine,
                    timeout.as_secs()
                );
                let _ = child.kill().await;
                metrics::record_engine_run(&engine, "timeout");
                return Err(MediaError::timeout(operation, timeout.as_secs()));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let output = ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        };

        let outcome = if output.success() { "ok" } else { "failed" };
        metrics::record_engine_run(&engine, outcome);
        debug!(
            operation,
            exit_code = ?output.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} finished",
            engine
        );

        Ok(output)
    }

    /// Run an FFmpeg command, mapping a non-zero exit to
    /// [`MediaError::EngineExecutionFailed`].
    pub async fn run_ffmpeg(
        &self,
        ffmpeg: &Path,
        cmd: &FfmpegCommand,
        timeout: Duration,
        operation: &str,
    ) -> MediaResult<ProcessOutput> {
        let output = self.run(ffmpeg, &cmd.build_args(), timeout, operation).await?;
        if output.success() {
            Ok(output)
        } else {
            let stderr_tail = output.stderr_tail(STDERR_TAIL_CHARS);
            warn!(operation, exit_code = ?output.exit_code, stderr = %stderr_tail, "FFmpeg failed");
            Err(MediaError::engine_failed(operation, stderr_tail, output.exit_code))
        }
    }
}

/// Wait for the child, returning early if the cancel signal fires.
async fn wait_or_cancel(
    child: &mut Child,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<ExitStatus> {
    let Some(mut cancel_rx) = cancel_rx else {
        return Ok(child.wait().await?);
    };

    loop {
        if *cancel_rx.borrow_and_update() {
            return Err(MediaError::Cancelled);
        }
        tokio::select! {
            status = child.wait() => return Ok(status?),
            changed = cancel_rx.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can cancel any more.
                    return Ok(child.wait().await?);
                }
            }
        }
    }
}

async fn read_to_string<R>(reader: Option<R>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("output.mp4")
            .input_with_args(["-ss", "10.000"], "input.mp4")
            .duration(30.0)
            .video_codec("libx264")
            .crf(18);

        let args = cmd.build_args();
        assert_eq!(&args[..4], &["-y", "-hide_banner", "-v", "error"]);
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i);
        assert!(args.contains(&"30.000".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_multiple_inputs_in_order() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input("a.mp4")
            .input_with_args(["-stream_loop", "-1"], "music.mp3")
            .lavfi("anullsrc=channel_layout=stereo:sample_rate=44100");

        assert_eq!(cmd.input_count(), 3);
        let args = cmd.build_args();
        let sources: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-i")
            .map(|w| w[1].clone())
            .collect();
        assert_eq!(
            sources,
            vec!["a.mp4", "music.mp3", "anullsrc=channel_layout=stereo:sample_rate=44100"]
        );
        let lavfi = args.iter().position(|a| a == "lavfi").unwrap();
        assert_eq!(args[lavfi - 1], "-f");
    }

    #[test]
    fn test_stderr_tail() {
        let output = ProcessOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: format!("{}end\n", "x".repeat(1000)),
        };
        let tail = output.stderr_tail(STDERR_TAIL_CHARS);
        assert_eq!(tail.chars().count(), 500);
        assert!(tail.ends_with("end"));

        let short = ProcessOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "short".to_string(),
        };
        assert_eq!(short.stderr_tail(500), "short");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(
                Path::new("/bin/sh"),
                &sh("echo out; echo err >&2; exit 3"),
                Duration::from_secs(5),
                "test",
            )
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout_kills_process() {
        let runner = ProcessRunner::new();
        let started = Instant::now();
        let err = runner
            .run(Path::new("/bin/sh"), &sh("sleep 10"), Duration::from_millis(200), "slow")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ProcessingTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_cancellation() {
        let (tx, rx) = watch::channel(false);
        let runner = ProcessRunner::new().with_cancel(rx);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });
        let err = runner
            .run(Path::new("/bin/sh"), &sh("sleep 10"), Duration::from_secs(5), "cancel")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let (_tx, rx) = watch::channel(true);
        let runner = ProcessRunner::new().with_cancel(rx);
        let err = runner
            .run(Path::new("/nonexistent/engine"), &[], Duration::from_secs(1), "noop")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_ffmpeg_maps_failure() {
        // sh rejects ffmpeg's leading `-y` flag and exits non-zero
        let runner = ProcessRunner::new();
        let cmd = FfmpegCommand::new("/tmp/never.mp4").input("in.mp4");
        let err = runner
            .run_ffmpeg(Path::new("/bin/sh"), &cmd, Duration::from_secs(5), "merge")
            .await
            .unwrap_err();
        match err {
            MediaError::EngineExecutionFailed { operation, exit_code, .. } => {
                assert_eq!(operation, "merge");
                assert_ne!(exit_code, Some(0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
