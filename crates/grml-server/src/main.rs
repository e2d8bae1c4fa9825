//! Binary entrypoint for the GrML relay.
//!
//! Reads configuration from environment variables:
//! - `GRML_HOST`: listen address (default: "0.0.0.0")
//! - `GRML_PORT`: listen port (default: "7000")

use grml_server::config::RelayConfig;
use grml_server::router::build_router;
use grml_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env().expect("Invalid relay configuration");
    let app = build_router(AppState::new());

    let addr = config.addr();
    tracing::info!("grml relay starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
