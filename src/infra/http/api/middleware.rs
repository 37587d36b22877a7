use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use super::error::ApiError;

/// Header carrying the authenticated user, set by the upstream auth proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

pub async fn require_principal(mut request: Request<Body>, next: Next) -> Response {
    let raw = match request.headers().get(USER_ID_HEADER) {
        Some(value) => value,
        None => return ApiError::unauthorized(None).into_response(),
    };

    let user_id = match raw.to_str().ok().map(str::trim).map(Uuid::parse_str) {
        Some(Ok(user_id)) => user_id,
        _ => {
            return ApiError::unauthorized(Some(format!("`{USER_ID_HEADER}` must be a UUID")))
                .into_response();
        }
    };

    let principal = Principal { user_id };
    request.extensions_mut().insert(principal);

    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}
