use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::database::AppState;
use crate::error::AppError;

/// Header carrying the storefront's shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware to check the static API key
///
/// Every `/api` request must carry an `x-api-key` header equal to the
/// configured key. CORS pre-flight (`OPTIONS`) requests pass through
/// untouched so browsers can discover the allowed headers first.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key) if key == state.config.api_key => next.run(request).await,
        _ => AppError::Unauthorized("Unauthorized".to_string()).into_response(),
    }
}
