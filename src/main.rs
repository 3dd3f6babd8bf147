use std::sync::Arc;

use splice::config::Config;
use splice::server;
use splice::telemetry::{self, TracingSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = Config::path();
    let cfg = Config::from_file(&path)?;
    telemetry::init(&cfg)?;

    if path.exists() {
        tracing::info!(path = %path.display(), "Loaded configuration");
    } else {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
    }

    tokio::select! {
        res = server::listener::run(cfg, Arc::new(TracingSink)) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
