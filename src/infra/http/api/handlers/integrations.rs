//! Integration handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use super::integration_to_api;
use crate::application::repos::IntegrationQueryFilter;
use crate::domain::types::IntegrationStatus;
use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::middleware::Principal;
use crate::infra::http::api::models::{
    CreateIntegrationRequest, IntegrationListQuery, IntegrationView, UpdateIntegrationRequest,
    integration_changes, new_integration,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_integrations(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<IntegrationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            IntegrationStatus::try_from(raw).map_err(|_| {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    codes::VALIDATION,
                    "validation failed",
                    Some(format!("unknown integration status `{raw}`")),
                )
            })
        })
        .transpose()?;

    let integrations = state
        .integrations
        .list_for_owner(principal.user_id, &IntegrationQueryFilter { status })
        .await
        .map_err(integration_to_api)?;
    let views: Vec<IntegrationView> = integrations.into_iter().map(Into::into).collect();
    Ok(Json(views))
}

pub async fn create_integration(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateIntegrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let integration = state
        .integrations
        .create(principal.user_id, new_integration(payload))
        .await
        .map_err(integration_to_api)?;
    Ok((StatusCode::CREATED, Json(IntegrationView::from(integration))))
}

pub async fn update_integration(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateIntegrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let integration = state
        .integrations
        .update(principal.user_id, id, integration_changes(payload))
        .await
        .map_err(integration_to_api)?;
    Ok(Json(IntegrationView::from(integration)))
}
