use std::path::Path;

use reelkit_media::{check_engine, Engine, JobWorkspace};
use reelkit_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_engine(Engine::Ffmpeg)?;
    ensure_engine(Engine::Ffprobe)?;
    ensure_font(config.font_file.as_deref())?;

    println!("worker-selfcheck: ok");
    Ok(())
}

/// The work dir must exist and accept a workspace.
async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let ws = JobWorkspace::create(path, "selfcheck")
        .map_err(|e| anyhow::anyhow!("work dir {} not writable: {}", path.display(), e))?;
    ws.cleanup();
    Ok(())
}

fn ensure_engine(engine: Engine) -> anyhow::Result<()> {
    let path = check_engine(engine).map_err(|e| anyhow::anyhow!("{}", e))?;
    let output = std::process::Command::new(&path)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not runnable: {}", path.display(), e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            path.display(),
            output.status
        ));
    }
    println!("worker-selfcheck: {} at {}", engine.binary_name(), path.display());
    Ok(())
}

fn ensure_font(font: Option<&Path>) -> anyhow::Result<()> {
    match font {
        Some(font) if !font.is_file() => Err(anyhow::anyhow!(
            "REELKIT_FONT_FILE {} does not exist",
            font.display()
        )),
        _ => Ok(()),
    }
}
