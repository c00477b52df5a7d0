use anyhow::Context;
use clap::Parser;
use fog_vision::ThresholdConfig;
use fog_vision::pipeline::{DEFAULT_LAPLACIAN_THRESHOLD, DEFAULT_STD_DEV_THRESHOLD};

use crate::ServerConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Command line and environment configuration for the detection service.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "HTTP fog detection service")]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(long, env = "FOG_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Laplacian variance threshold used when a request does not supply one.
    #[arg(long, env = "LAPLACIAN_THRESHOLD", default_value_t = DEFAULT_LAPLACIAN_THRESHOLD)]
    pub laplacian_threshold: f64,

    /// Histogram standard deviation threshold used when a request does not supply one.
    #[arg(long, env = "HIST_STD_DEV_THRESHOLD", default_value_t = DEFAULT_STD_DEV_THRESHOLD)]
    pub std_dev_threshold: f64,

    /// Comma separated list of origins allowed by CORS.
    #[arg(
        long,
        env = "FOG_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "FOG_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Concurrent analyses. Defaults to the number of CPUs.
    #[arg(long, env = "FOG_ANALYSIS_WORKERS")]
    pub analysis_workers: Option<usize>,
}

impl ServerArgs {
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let thresholds = ThresholdConfig::new(self.laplacian_threshold, self.std_dev_threshold)
            .context("invalid default thresholds")?;
        let allowed_origins = self
            .allowed_origins
            .into_iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(ServerConfig {
            bind_addr: self.bind,
            thresholds,
            allowed_origins,
            max_upload_bytes: self.max_upload_bytes.max(1),
            analysis_workers: self.analysis_workers.unwrap_or_else(num_cpus::get).max(1),
        })
    }
}
