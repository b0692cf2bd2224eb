use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Middleware that requires a valid bearer token
///
/// The token must be provided in the `Authorization` header as
/// `Bearer <token>`. On success the resolved [`crate::auth::Owner`] is stored
/// in the request extensions for the handler to pick up.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(owner) = state.auth.identify_headers(request.headers()) else {
        tracing::debug!(path = %request.uri().path(), "missing or invalid bearer token");
        return Err(AppError::Unauthorized);
    };

    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}
