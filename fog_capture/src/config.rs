use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fog_vision::encoder::{DEFAULT_JPEG_QUALITY, DEFAULT_RASTER_HEIGHT, DEFAULT_RASTER_WIDTH};
use fog_vision::pipeline::{DEFAULT_LAPLACIAN_THRESHOLD, DEFAULT_STD_DEV_THRESHOLD};
use fog_vision::{EncoderConfig, LoopConfig, ThresholdConfig};

use crate::sources::SourceSpec;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

#[derive(Parser, Debug)]
#[command(author, version, about = "Feed live frames to the fog detection service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the capture loop until interrupted.
    Run(RunArgs),
    /// Analyze a single image file and print the result as JSON.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ThresholdArgs {
    #[arg(long, env = "LAPLACIAN_THRESHOLD", default_value_t = DEFAULT_LAPLACIAN_THRESHOLD)]
    pub laplacian_threshold: f64,

    #[arg(long, env = "HIST_STD_DEV_THRESHOLD", default_value_t = DEFAULT_STD_DEV_THRESHOLD)]
    pub std_dev_threshold: f64,
}

impl ThresholdArgs {
    pub fn thresholds(&self) -> anyhow::Result<ThresholdConfig> {
        ThresholdConfig::new(self.laplacian_threshold, self.std_dev_threshold)
            .context("invalid thresholds")
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Base URL of the detection service.
    #[arg(long, env = "FOG_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// Analyze in-process instead of calling the service.
    #[arg(long)]
    pub local: bool,

    /// What to capture from: camera:<index>, image:<path> or synthetic:<uniform|noise|checkerboard>.
    #[arg(long, default_value = "camera:0")]
    pub source: SourceSpec,

    #[arg(long, default_value_t = 1200)]
    pub interval_ms: u64,

    /// Deadline for one detection round trip.
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long, default_value_t = DEFAULT_RASTER_WIDTH)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_RASTER_HEIGHT)]
    pub height: u32,

    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

impl RunArgs {
    pub fn loop_config(&self) -> anyhow::Result<LoopConfig> {
        anyhow::ensure!(self.interval_ms > 0, "interval must be positive");
        anyhow::ensure!(self.timeout_ms > 0, "timeout must be positive");
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "raster size must be positive"
        );
        Ok(LoopConfig {
            interval: Duration::from_millis(self.interval_ms),
            request_timeout: Duration::from_millis(self.timeout_ms),
            encoder: EncoderConfig {
                width: self.width,
                height: self.height,
                jpeg_quality: self.jpeg_quality,
            },
            thresholds: self.thresholds.thresholds()?,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Image file to analyze.
    pub file: PathBuf,

    /// Send the image to this service instead of analyzing it in-process.
    #[arg(long, env = "FOG_SERVICE_URL")]
    pub service_url: Option<String>,

    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}
