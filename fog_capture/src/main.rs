use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fog_capture::config::{AnalyzeArgs, Cli, Command, RunArgs};
use fog_capture::{HttpDetector, SpecProvider};
use fog_vision::{
    CaptureLoop, DetectionResult, Detector, EncodedFrame, LocalDetector, SessionState, detect,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Analyze(args) => analyze(args).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.loop_config()?;

    let detector: Arc<dyn Detector> = if args.local {
        info!("analyzing frames in-process");
        Arc::new(LocalDetector)
    } else {
        let http = HttpDetector::new(&args.service_url, config.request_timeout)?;
        info!(endpoint = %http.endpoint(), "submitting frames to detection service");
        Arc::new(http)
    };

    let provider =
        SpecProvider::new(args.source.clone(), config.encoder.width, config.encoder.height);
    let mut capture = CaptureLoop::new(provider, detector, config);
    let mut updates = capture.subscribe();

    capture
        .start()
        .with_context(|| format!("could not start capturing from {}", args.source))?;

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut last_seen = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = &mut deadline => {
                info!("run duration reached");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if report(&state, &mut last_seen) {
                    break;
                }
            }
        }
    }

    let stats = capture.state().stats;
    capture.stop().await;
    info!(
        ticks = stats.ticks,
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        skipped_in_flight = stats.skipped_in_flight,
        skipped_no_frame = stats.skipped_no_frame,
        "capture finished"
    );
    Ok(())
}

/// Log anything new in `state`. Returns `true` once the session has ended on its own.
fn report(state: &SessionState, last_seen: &mut Option<(u64, u64)>) -> bool {
    let seen = (state.stats.completed, state.stats.failed);
    if *last_seen != Some(seen) {
        *last_seen = Some(seen);
        if let Some(result) = &state.last_result {
            info!(
                "{} | laplacian variance {:.1} | histogram std dev {:.1} | {}",
                result.message.as_deref().unwrap_or(result.intensity.label()),
                result.laplacian_variance,
                result.histogram_std_dev,
                result.advice
            );
        }
        if let Some(err) = &state.last_error {
            warn!("{err}");
        }
    }

    match &state.last_error {
        Some(err) if err.is_fatal() && !state.is_running() => {
            warn!("capture session ended: {err}");
            true
        }
        _ => false,
    }
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let thresholds = args.thresholds.thresholds()?;
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("could not read {}", args.file.display()))?;

    let result: DetectionResult = match &args.service_url {
        Some(url) => {
            let detector = HttpDetector::new(url, Duration::from_millis(args.timeout_ms))?;
            let content_type = match image::guess_format(&bytes) {
                Ok(format) => format.to_mime_type(),
                Err(_) => "application/octet-stream",
            };
            let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
                .with_guessed_format()
                .ok()
                .and_then(|reader| reader.into_dimensions().ok())
                .unwrap_or((0, 0));
            let frame = EncodedFrame::new(bytes, width, height, content_type);
            detector.submit(frame, thresholds).await?
        }
        None => tokio::task::spawn_blocking(move || detect(&bytes, &thresholds)).await??,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
