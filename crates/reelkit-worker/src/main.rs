//! Media job worker binary.
//!
//! Usage: `reelkit-worker <job.json|-> [output-file]`
//!
//! Reads one job envelope, runs it, writes the produced media to the output
//! file and prints a JSON report on stdout. Exits non-zero when the job fails.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelkit_worker::{JobEnvelope, JobExecutor, WorkerConfig};

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelkit=info,info"));

    // Logs go to stderr; stdout carries the report
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn read_job(source: &str) -> anyhow::Result<Vec<u8>> {
    if source == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        Ok(buf)
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("reading job file {source}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(job_source) = args.next() else {
        anyhow::bail!("usage: reelkit-worker <job.json|-> [output-file]");
    };
    let output = args.next().map(PathBuf::from);

    let config = WorkerConfig::from_env();
    info!(?config, "Starting reelkit-worker");

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing Prometheus exporter")?;
        info!(%addr, "Serving metrics");
    }

    let envelope = JobEnvelope::from_json(&read_job(&job_source).await?)?;
    let executor = Arc::new(JobExecutor::new(config)?);

    // Ctrl-C kills the running engine; the job then reports as cancelled
    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, cancelling job");
            signal_executor.cancel();
        }
    });

    let report = executor.run(&envelope, output.as_deref()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        std::process::exit(1);
    }
    info!("Worker finished");
    Ok(())
}
