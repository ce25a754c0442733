// NoteHub - shared note catalog server
// Entry point and application setup

use notehub::config::ServerConfig;
use notehub::{app, handlers};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notehub=debug,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting NoteHub v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    tracing::info!(?config, "Loaded configuration");

    let state = app::setup(config).await?;

    handlers::serve(state).await?;

    tracing::info!("NoteHub stopped");
    Ok(())
}
