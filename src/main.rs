use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use api_shared::startup::connect_from_env;
use ward_core::constants::DEFAULT_REST_ADDR;

/// Main entry point for the ward census server
///
/// Starts the REST API (with Swagger UI at `/swagger-ui`) against the record source selected by
/// the environment.
///
/// # Environment Variables
/// - `WARD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WARD_SOURCE_URL` / `WARD_SOURCE_KEY`: PostgREST endpoint and API key
/// - `WARD_FIXTURE_FILE`: JSON fixture for an in-memory source when no URL is set
/// - `WARD_MAX_CONCURRENT_QUERIES`: count queries in flight per statistics call (default: 8)
/// - `WARD_REQUEST_TIMEOUT_SECS`: record service request timeout (default: 15)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the record source cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ward=info".parse()?)
                .add_directive("ward_run=info".parse()?)
                .add_directive("ward_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("WARD_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let (cfg, source) = connect_from_env()?;
    let app = router(AppState::new(Arc::new(cfg), source));

    tracing::info!("++ Starting ward REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
