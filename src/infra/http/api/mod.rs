pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use middleware::{Principal, USER_ID_HEADER};
pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/v1/integration-definitions",
            get(handlers::list_definitions),
        )
        .route(
            "/api/v1/integration-definitions/{code}",
            get(handlers::get_definition),
        )
        .route(
            "/api/v1/integrations",
            get(handlers::list_integrations).post(handlers::create_integration),
        )
        .route(
            "/api/v1/integrations/{id}",
            patch(handlers::update_integration),
        )
        .route(
            "/api/v1/publish-targets",
            get(handlers::list_targets).post(handlers::create_target),
        )
        .route("/api/v1/publish-targets/{id}", get(handlers::get_target))
        .route(
            "/api/v1/publish-targets/{id}/enabled",
            post(handlers::set_target_enabled),
        )
        .route(
            "/api/v1/publish-targets/{id}/publish",
            post(handlers::publish_target),
        )
        .route(
            "/api/v1/publish-targets/{id}/logs",
            get(handlers::list_target_logs),
        )
        .with_state(state)
        .route_layer(axum_middleware::from_fn(middleware::require_principal))
}
