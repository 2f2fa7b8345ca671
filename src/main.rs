use std::sync::Arc;

use anyhow::Context;
use roomboard::{AppState, Config, app, db};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomboard=info,tower_http=info")))
        .init();

    let config = Config::from_env()?;

    tokio::fs::create_dir_all(&config.media_dir)
        .await
        .with_context(|| format!("creating media dir {}", config.media_dir.display()))?;

    let db_pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    let app_state = AppState {
        db_pool,
        config: Arc::new(config),
    };
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
