//! Shared domain enumerations aligned with persisted text columns.

use serde::{Deserialize, Serialize};

pub use inkwire_api_types::{IntegrationStatus, PublishLogStatus, PublishTargetStatus};

/// Closed set of reasons a publish attempt can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    DefinitionNotFound,
    HandlerResolution,
    HandlerPublish,
    HandlerTimeout,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::DefinitionNotFound => "definition_not_found",
            FailureKind::HandlerResolution => "handler_resolution",
            FailureKind::HandlerPublish => "handler_publish",
            FailureKind::HandlerTimeout => "handler_timeout",
        }
    }
}

impl TryFrom<&str> for FailureKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, ()> {
        match value {
            "definition_not_found" => Ok(FailureKind::DefinitionNotFound),
            "handler_resolution" => Ok(FailureKind::HandlerResolution),
            "handler_publish" => Ok(FailureKind::HandlerPublish),
            "handler_timeout" => Ok(FailureKind::HandlerTimeout),
            _ => Err(()),
        }
    }
}
