mod config;
mod errors;
mod layout;
mod poster;
mod render;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::{available_templates, StyleSelection, DEFAULT_TEMPLATE_ID};
use crate::render::load_font;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Poster API v{}", env!("CARGO_PKG_VERSION"));

    // Font loading is blocking file IO; do it once before serving
    let font = load_font(config.font_path.as_deref());
    if font.is_none() {
        warn!("No usable font found; PNG rendering disabled, planning uses static metrics");
    }

    let selection = StyleSelection::parse(Some(&config.default_template), DEFAULT_TEMPLATE_ID);
    info!(
        "Default template: {} ({} templates available)",
        selection.id(),
        available_templates().len()
    );

    let state = AppState::new(config.clone(), font);
    info!(
        "Solver: lenient_overflow={} data_overlap_tolerance={} strict_data_bounds={}",
        state.solver.lenient_overflow,
        state.solver.data_overlap_tolerance,
        state.solver.strict_data_bounds
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
