use anyhow::Result;

mod config;
mod error;
mod logging;
mod models;
mod routes;
mod services;

use services::{excel::ExcelLoader, session::SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.socket_addr();

    // Build our application state
    let state = std::sync::Arc::new(AppState::new(config));
    let app = routes::app(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    config: config::Config,
    loader: ExcelLoader,
    sessions: SessionStore,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let loader = ExcelLoader::new(config.max_file_size);
        let sessions = SessionStore::new(config.max_sessions, config.session_ttl);
        Self {
            config,
            loader,
            sessions,
        }
    }
}
