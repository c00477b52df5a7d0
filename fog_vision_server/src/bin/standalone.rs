use clap::Parser;
use fog_vision_server::{ServerArgs, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerArgs::parse().into_config()?;
    let (addr, server) = start_server(config).await?;
    info!("detect endpoint: POST http://{addr}/detect-fog");

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    Ok(())
}
