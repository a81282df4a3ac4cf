use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{AppState, RemoteAppointmentStore};
use shared_config::AppConfig;
use shared_database::BookingApiClient;
use shared_utils::SystemClock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting booking admin gateway");

    // Load configuration
    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("BOOKING_API_URL is empty; every booking API call will fail");
    }

    let client = BookingApiClient::new(&config).context("failed to build booking API client")?;
    info!("Booking API at {}", client.get_base_url());
    let store = Arc::new(RemoteAppointmentStore::new(Arc::new(client)));

    // Create shared state
    let state = AppState::new(Arc::new(config), store, Arc::new(SystemClock))
        .context("invalid schedule configuration")?;
    let bind_addr = state.config.bind_addr.clone();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
