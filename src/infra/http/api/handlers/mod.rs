//! API handlers organized by resource type.
//!
//! Error conversions shared by the resource modules live here.

mod definitions;
mod integrations;
mod targets;

pub use definitions::*;
pub use integrations::*;
pub use targets::*;

use axum::http::StatusCode;

use crate::application::catalog::CatalogError;
use crate::application::content::ContentError;
use crate::application::integrations::IntegrationServiceError;
use crate::application::publish::PublishError;
use crate::application::repos::RepoError;
use crate::application::targets::PublishTargetServiceError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "duplicate record",
            Some(constraint),
        ),
        RepoError::Pagination(p) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "invalid cursor",
            Some(p.to_string()),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "integrity constraint violated",
            Some(message),
        ),
        RepoError::Conflict { entity, id } => ApiError::new(
            StatusCode::CONFLICT,
            codes::CONFLICT,
            "concurrent modification",
            Some(format!("{entity} `{id}`")),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "persistence error",
            Some(message),
        ),
    }
}

fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "validation failed",
            Some(err.to_string()),
        ),
        DomainError::NotFound { .. } => ApiError::not_found("resource not found"),
    }
}

fn content_to_api(err: ContentError) -> ApiError {
    match err {
        ContentError::UnknownKind(_) | ContentError::NotFound(_) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UNKNOWN_CONTENT,
            "content could not be resolved",
            Some(err.to_string()),
        ),
        ContentError::Unavailable(_) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CONTENT_UNAVAILABLE,
            "content lookup unavailable",
            Some(err.to_string()),
        ),
    }
}

fn publish_to_api(err: PublishError) -> ApiError {
    match err {
        PublishError::TargetNotFound(_) => ApiError::not_found("publish target not found"),
        PublishError::IntegrationNotFound(id) => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "integration missing for publish target",
            Some(format!("integration `{id}`")),
        ),
        PublishError::Conflict(id) => ApiError::new(
            StatusCode::CONFLICT,
            codes::CONFLICT,
            "publish target was modified concurrently",
            Some(format!("publish target `{id}`")),
        ),
        PublishError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn catalog_to_api(err: CatalogError) -> ApiError {
    match err {
        CatalogError::UnknownCode(_) => ApiError::not_found("integration definition not found"),
        CatalogError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn integration_to_api(err: IntegrationServiceError) -> ApiError {
    match err {
        IntegrationServiceError::Domain(err) => domain_to_api(err),
        IntegrationServiceError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn target_to_api(err: PublishTargetServiceError) -> ApiError {
    match err {
        PublishTargetServiceError::NotFound => ApiError::not_found("publish target not found"),
        PublishTargetServiceError::Disabled => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::TARGET_DISABLED,
            "target is disabled",
            None,
        ),
        PublishTargetServiceError::Domain(err) => domain_to_api(err),
        PublishTargetServiceError::Content(err) => content_to_api(err),
        PublishTargetServiceError::Publish(err) => publish_to_api(err),
        PublishTargetServiceError::Repo(err) => repo_to_api(err),
    }
}
