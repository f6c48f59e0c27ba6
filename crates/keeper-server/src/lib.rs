pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub use state::StatusState;

/// Build the axum Router with the status routes.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/status", get(routes::status::get_status))
        .route("/api/events", get(routes::events::sse_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the status API on a pre-bound listener until `cancel` fires.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: StatusState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(state);

    tracing::info!("status server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
