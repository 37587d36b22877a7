//! Generic content references.
//!
//! A publish target points at a content object owned by the surrounding system
//! through a `(kind, object_id)` pair. Kinds are dotted `app.model` labels such
//! as `blog.note`; the set is open, so nothing here checks that the object
//! exists. That is the job of a `ContentResolver`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

const MAX_KIND_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    kind: String,
    object_id: Uuid,
}

impl ContentRef {
    pub fn new(kind: impl Into<String>, object_id: Uuid) -> Result<Self, DomainError> {
        let kind = kind.into();
        validate_kind(&kind)?;
        Ok(Self { kind, object_id })
    }

    /// Parse an identifier supplied by a client.
    pub fn parse(kind: &str, object_id: &str) -> Result<Self, DomainError> {
        let trimmed = object_id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("object_id", "this field is required"));
        }
        let object_id = Uuid::parse_str(trimmed)
            .map_err(|_| DomainError::validation("object_id", "must be a valid UUID"))?;
        Self::new(kind.trim(), object_id)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn object_id(&self) -> Uuid {
        self.object_id
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.object_id)
    }
}

fn validate_kind(kind: &str) -> Result<(), DomainError> {
    if kind.is_empty() {
        return Err(DomainError::validation("content_kind", "this field is required"));
    }
    if kind.len() > MAX_KIND_LEN {
        return Err(DomainError::validation(
            "content_kind",
            format!("must be at most {MAX_KIND_LEN} characters"),
        ));
    }

    let mut parts = kind.split('.');
    let (Some(app), Some(model), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(DomainError::validation(
            "content_kind",
            "expected `app.model`",
        ));
    };

    let segment_ok = |segment: &str| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    if !segment_ok(app) || !segment_ok(model) {
        return Err(DomainError::validation(
            "content_kind",
            "segments may only contain lowercase letters, digits and underscores",
        ));
    }

    Ok(())
}
