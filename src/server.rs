//! Read-only JSON API over the latest refresh output.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::refresh::LiveView;

type ViewRx = watch::Receiver<LiveView>;

pub fn create_router(view: ViewRx) -> Router {
    Router::new()
        .route("/api/buses", get(buses))
        .route("/api/alerts", get(alerts))
        .route("/api/state", get(state))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(view)
}

/// Serves the API on `addr` until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, view: ViewRx, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");

    axum::serve(listener, create_router(view))
        .with_graceful_shutdown(shutdown)
        .await
}

fn not_ready(view: &LiveView) -> Response {
    let body = match &view.last_failure {
        Some(failure) => json!({
            "error": "No bus data available yet.",
            "lastFailure": failure,
        }),
        None => json!({ "error": "No bus data available yet." }),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

async fn buses(State(view): State<ViewRx>) -> Response {
    let view = view.borrow();
    match &view.latest {
        Some(latest) => Json(&latest.reports).into_response(),
        None => not_ready(&view),
    }
}

async fn alerts(State(view): State<ViewRx>) -> Response {
    let view = view.borrow();
    match &view.latest {
        Some(latest) => Json(&latest.alerts).into_response(),
        None => not_ready(&view),
    }
}

async fn state(State(view): State<ViewRx>) -> Response {
    let view = view.borrow();
    if view.latest.is_none() {
        return not_ready(&view);
    }
    Json(&*view).into_response()
}

async fn health() -> &'static str {
    "OK"
}
