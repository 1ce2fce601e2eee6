//! leadflow service entry point
//!
//! Reads configuration from the environment (and `.env`), then serves the REST
//! API until SIGTERM or Ctrl+C.

use leadflow::{Config, LeadFlow};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("leadflow=info,tower_http=info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        bind_address = %config.server.api.bind_address,
        data_dir = %config.storage.data_dir.display(),
        "Starting leadflow"
    );

    let flow = LeadFlow::new(config)?;
    leadflow::run_with_shutdown(flow).await?;

    tracing::info!("leadflow stopped");
    Ok(())
}
