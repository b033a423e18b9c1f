pub mod api; // HTTP routes, middleware and server
pub mod booking;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod models;
pub mod session_cache;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    State(#[from] core_state::CoreError),
    #[error(transparent)]
    Server(#[from] api::server::ServerError),
}

/// Load configuration, open the database and serve until shutdown.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::Config::load();
    let core = Arc::new(core_state::CoreState::from_config(&settings)?);

    api::server::serve(core, &settings).await?;

    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
