pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, middleware as axum_middleware, routing::get};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;
use crate::infra::db::PostgresRepositories;

/// Store check behind `/health`; `None` reports healthy without a database.
#[derive(Clone, Default)]
pub struct HealthState {
    pub db: Option<PostgresRepositories>,
}

/// Full HTTP surface: the v1 API plus `/health`, wrapped in request-id and
/// response-logging middleware.
pub fn build_router(api: ApiState, health: HealthState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(health);

    Router::new()
        .merge(build_api_router(api))
        .merge(health_routes)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health_check(State(state): State<HealthState>) -> Response {
    match state.db {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
