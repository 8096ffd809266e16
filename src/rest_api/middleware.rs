//! Error rendering per environment

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::errors::ErrorReport;
use super::server::AppState;

/// Re-renders error responses with the full report in development.
///
/// Production responses are left as rendered by the error itself.
pub async fn render_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };
    if state.environment.is_production() {
        return response;
    }
    (response.status(), Json(report.development_body())).into_response()
}
