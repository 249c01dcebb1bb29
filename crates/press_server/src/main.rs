use anyhow::{Context, Result};
use press_logging::{parse_level, press_error, press_info};
use press_server::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    press_logging::initialize(
        config.log_destination,
        parse_level(&config.log_level),
        &config.log_file,
    );

    let state = AppState::from_config(&config).context("Failed to initialize converters")?;
    press_info!(
        "Formats available: {:?} (default {})",
        state.renderers.formats(),
        state.default_format
    );
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    press_info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    press_info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        press_error!("Could not listen for shutdown signal: {}", err);
    }
}
