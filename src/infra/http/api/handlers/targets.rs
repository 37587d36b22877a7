//! Publish target handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::target_to_api;
use crate::application::pagination::{DEFAULT_PAGE_LIMIT, PageRequest, PublishLogCursor};
use crate::application::repos::PublishTargetQueryFilter;
use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::middleware::Principal;
use crate::infra::http::api::models::{
    CreatePublishTargetRequest, LogListQuery, PublishAttemptView, PublishTargetListQuery,
    PublishTargetView, SetEnabledRequest, log_page, new_publish_target,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_targets(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PublishTargetListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = PublishTargetQueryFilter {
        content_kind: query.content_kind,
        object_id: query.object_id,
    };
    let targets = state
        .targets
        .list_for_owner(principal.user_id, &filter)
        .await
        .map_err(target_to_api)?;
    let views: Vec<PublishTargetView> = targets.into_iter().map(Into::into).collect();
    Ok(Json(views))
}

pub async fn create_target(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreatePublishTargetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .targets
        .create(principal.user_id, new_publish_target(payload))
        .await
        .map_err(target_to_api)?;
    Ok((StatusCode::CREATED, Json(PublishTargetView::from(target))))
}

pub async fn get_target(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .targets
        .get(principal.user_id, id)
        .await
        .map_err(target_to_api)?;
    Ok(Json(PublishTargetView::from(target)))
}

pub async fn set_target_enabled(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetEnabledRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .targets
        .set_enabled(principal.user_id, id, payload.is_enabled)
        .await
        .map_err(target_to_api)?;
    Ok(Json(PublishTargetView::from(target)))
}

/// The request body is the content payload handed to the handler; an empty
/// body publishes `{}`.
pub async fn publish_target(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    payload: Option<Json<Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let content = payload
        .map(|Json(content)| content)
        .unwrap_or_else(|| Value::Object(Map::new()));
    let report = state
        .targets
        .publish(principal.user_id, id, content)
        .await
        .map_err(target_to_api)?;
    Ok(Json(PublishAttemptView::from(report)))
}

pub async fn list_target_logs(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(query): Query<LogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = match query
        .cursor
        .as_deref()
        .map(PublishLogCursor::decode)
        .transpose()
    {
        Ok(cursor) => cursor,
        Err(err) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_CURSOR,
                "invalid cursor",
                Some(err.to_string()),
            ));
        }
    };
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let page = state
        .targets
        .list_logs(principal.user_id, id, PageRequest::new(limit, cursor))
        .await
        .map_err(target_to_api)?;

    Ok(Json(log_page(page)))
}
