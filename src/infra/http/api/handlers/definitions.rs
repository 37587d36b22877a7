//! Integration definition catalog handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::catalog_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::IntegrationDefinitionView;
use crate::infra::http::api::state::ApiState;

pub async fn list_definitions(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let definitions = state.catalog.list_active().await.map_err(catalog_to_api)?;
    let views: Vec<IntegrationDefinitionView> =
        definitions.into_iter().map(Into::into).collect();
    Ok(Json(views))
}

pub async fn get_definition(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let definition = state
        .catalog
        .find_by_code(&code)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(IntegrationDefinitionView::from(definition)))
}
