//! End-to-end operation tests against real engines.
//!
//! Fixtures are generated with `lavfi` sources and served over a local mock
//! HTTP server. Run with `cargo test -p reelkit-media -- --ignored`.

use std::path::{Path, PathBuf};
use std::process::Command;

use reelkit_media::{EngineSet, MediaConfig, MediaError, MediaService};
use reelkit_models::{
    AudioRemixRequest, CardPosition, MergeRequest, RemixShape, ResizeRequest, ReverseRequest,
    SpeedRequest, TextOverlayRequest, TitleCardRequest, Transition, TrimRequest,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engines() -> &'static EngineSet {
    EngineSet::global().expect("ffmpeg and ffprobe must be installed")
}

/// Render a fixture with ffmpeg and return its bytes.
fn render(dir: &Path, name: &str, video: &str, audio: Option<&str>) -> Vec<u8> {
    let out = dir.join(name);
    let mut cmd = Command::new(&engines().ffmpeg);
    cmd.args(["-y", "-hide_banner", "-v", "error", "-f", "lavfi", "-i", video]);
    if let Some(audio) = audio {
        cmd.args(["-f", "lavfi", "-i", audio]);
    }
    cmd.args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]);
    if audio.is_some() {
        cmd.args(["-c:a", "aac", "-shortest"]);
    }
    cmd.arg(&out);
    let status = cmd.status().expect("spawn ffmpeg");
    assert!(status.success(), "fixture {name} failed to render");
    std::fs::read(&out).unwrap()
}

fn landscape_clip(dir: &Path, name: &str, secs: u32) -> Vec<u8> {
    render(
        dir,
        name,
        &format!("testsrc=size=320x240:rate=30:duration={secs}"),
        Some(&format!("sine=frequency=440:duration={secs}")),
    )
}

/// One mean-luma byte per frame.
fn luma_trace(file: &Path) -> Vec<u8> {
    let output = Command::new(&engines().ffmpeg)
        .args(["-hide_banner", "-v", "error", "-i"])
        .arg(file)
        .args(["-vf", "scale=1:1,format=gray", "-f", "rawvideo", "-"])
        .output()
        .expect("spawn ffmpeg");
    assert!(output.status.success());
    output.stdout
}

struct Harness {
    server: MockServer,
    fixtures: tempfile::TempDir,
    work_root: tempfile::TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            fixtures: tempfile::tempdir().unwrap(),
            work_root: tempfile::tempdir().unwrap(),
        }
    }

    async fn serve(&self, name: &str, body: Vec<u8>) -> String {
        Mock::given(method("GET"))
            .and(path(format!("/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&self.server)
            .await;
        format!("{}/{name}", self.server.uri())
    }

    fn config(&self) -> MediaConfig {
        MediaConfig::default().with_work_root(self.work_root.path())
    }

    fn service(&self) -> MediaService {
        MediaService::new(self.config()).unwrap()
    }

    fn write_output(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.fixtures.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn assert_workspaces_removed(&self) {
        let left = std::fs::read_dir(self.work_root.path()).unwrap().count();
        assert_eq!(left, 0, "workspace left behind");
    }
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_reverse_twice_restores_frame_order() {
    let h = Harness::start().await;
    // Brightness rises over time, so frame order is visible in the luma trace
    let ramp = render(
        h.fixtures.path(),
        "ramp.mp4",
        "color=c=white:s=64x64:r=10:d=2,fade=t=in:st=0:d=2",
        None,
    );
    let service = h.service();

    let url = h.serve("ramp.mp4", ramp).await;
    let once = service.reverse(&ReverseRequest::new(&url)).await.unwrap();
    let once_path = h.write_output("once.mp4", &once.buffer);

    let url = h.serve("once.mp4", once.buffer.clone()).await;
    let twice = service.reverse(&ReverseRequest::new(&url)).await.unwrap();
    let twice_path = h.write_output("twice.mp4", &twice.buffer);

    let original = luma_trace(&h.fixtures.path().join("ramp.mp4"));
    let reversed = luma_trace(&once_path);
    let restored = luma_trace(&twice_path);

    assert!(original.first() < original.last());
    assert!(reversed.first() > reversed.last());
    assert!(restored.first() < restored.last());
    assert_eq!(original.len(), restored.len());
    for (a, b) in original.iter().zip(&restored) {
        assert!(a.abs_diff(*b) <= 8, "frame drift: {original:?} vs {restored:?}");
    }
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_merge_with_crossfade() {
    let h = Harness::start().await;
    let a = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 2)).await;
    let b = h.serve("b.mp4", landscape_clip(h.fixtures.path(), "b.mp4", 2)).await;

    let request = MergeRequest::new(vec![a, b]).with_transition(Transition::Fade, 0.5);
    let result = h.service().merge(&request).await.unwrap();

    assert_eq!((result.width, result.height), (320, 240));
    assert!((result.duration_secs - 3.5).abs() < 0.3, "{}", result.duration_secs);
    assert!(result.warnings.is_empty());
    assert_eq!(result.operation(), "merge");
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_merge_hard_cut_of_mixed_orientation() {
    let h = Harness::start().await;
    let portrait = render(
        h.fixtures.path(),
        "p.mp4",
        "testsrc=size=240x320:rate=30:duration=1",
        None,
    );
    let p1 = h.serve("p1.mp4", portrait.clone()).await;
    let p2 = h.serve("p2.mp4", portrait).await;
    let l = h.serve("l.mp4", landscape_clip(h.fixtures.path(), "l.mp4", 1)).await;

    let result = h.service().merge(&MergeRequest::new(vec![p1, l, p2])).await.unwrap();
    assert_eq!((result.width, result.height), (240, 320));
    assert!((result.duration_secs - 3.0).abs() < 0.3);
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_merge_over_duration_limit() {
    let h = Harness::start().await;
    let a = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 2)).await;
    let b = h.serve("b.mp4", landscape_clip(h.fixtures.path(), "b.mp4", 2)).await;

    let mut config = h.config();
    config.max_merge_secs = 3.0;
    let service = MediaService::new(config).unwrap();
    let err = service.merge(&MergeRequest::new(vec![a, b])).await.unwrap_err();
    assert!(matches!(err, MediaError::DurationLimitExceeded { .. }));
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_resize_to_vertical_preset() {
    let h = Harness::start().await;
    let url = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 1)).await;

    let result = h
        .service()
        .resize_for_platform(&ResizeRequest::for_preset(url, "tiktok"))
        .await
        .unwrap();
    assert_eq!((result.width, result.height), (1080, 1920));
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_trim_clamps_to_source() {
    let h = Harness::start().await;
    let url = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 2)).await;

    let result = h
        .service()
        .trim(&TrimRequest::new(url, -5.0, 9999.0))
        .await
        .unwrap();
    assert!((result.duration_secs - 2.0).abs() < 0.3);
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_double_speed_halves_duration() {
    let h = Harness::start().await;
    let url = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 2)).await;

    let result = h
        .service()
        .change_speed(&SpeedRequest::new(url, 2.0))
        .await
        .unwrap();
    assert!((result.duration_secs - 1.0).abs() < 0.2);
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_text_overlay_with_awkward_text() {
    let h = Harness::start().await;
    let url = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 1)).await;

    let request = TextOverlayRequest::new(url, r"it's: 50%\path [1], ok; done");
    let result = h.service().add_text(&request).await.unwrap();
    assert_eq!((result.width, result.height), (320, 240));
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_title_card_extends_clip() {
    let h = Harness::start().await;
    let silent = render(
        h.fixtures.path(),
        "silent.mp4",
        "testsrc=size=320x240:rate=30:duration=2",
        None,
    );
    let url = h.serve("silent.mp4", silent).await;

    let mut request = TitleCardRequest::new(url, "Chapter one");
    request.subtitle = Some("The beginning".to_string());
    request.duration_secs = 1.5;
    request.position = CardPosition::End;
    let result = h.service().add_title_card(&request).await.unwrap();
    assert!((result.duration_secs - 3.5).abs() < 0.3);
    h.assert_workspaces_removed();
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn test_muted_remix_without_music_is_silent() {
    let h = Harness::start().await;
    let url = h.serve("a.mp4", landscape_clip(h.fixtures.path(), "a.mp4", 1)).await;

    let mut request = AudioRemixRequest::new(url);
    request.mute_original = true;
    let result = h.service().remix_audio(&request).await.unwrap();

    match result.details {
        reelkit_models::OperationDetails::AudioRemix { shape } => {
            assert_eq!(shape, RemixShape::Silent)
        }
        other => panic!("unexpected details: {other:?}"),
    }
    let out = h.write_output("silent-remix.mp4", &result.buffer);
    let volume = Command::new(&engines().ffmpeg)
        .args(["-hide_banner", "-i"])
        .arg(&out)
        .args(["-af", "volumedetect", "-f", "null", "-"])
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&volume.stderr);
    assert!(stderr.contains("max_volume: -91"), "{stderr}");
    h.assert_workspaces_removed();
}
