use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::StatusState;

/// GET /api/events — SSE stream with one `outcome` event per reported outcome.
///
/// Lagging subscribers silently skip what they missed.
pub async fn sse_events(State(app): State<StatusState>) -> impl axum::response::IntoResponse {
    let rx = app.history.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let outcome = msg.ok()?;
        let data = serde_json::to_string(&outcome).ok()?;
        Some(Ok::<Event, Infallible>(
            Event::default().event("outcome").data(data),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
