//! Boundary to the content objects owned by the surrounding platform.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::content::ContentRef;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("unknown content kind `{0}`")]
    UnknownKind(String),
    #[error("content `{0}` does not exist or is not owned by the caller")]
    NotFound(String),
    #[error("content lookup failed: {0}")]
    Unavailable(String),
}

/// Confirms that a content reference names a real object the caller owns.
///
/// Publish targets never dereference their content; this check runs once
/// when a target is created.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(&self, owner_id: Uuid, content: &ContentRef) -> Result<(), ContentError>;
}

/// Accepts any object id for a configured set of kinds.
///
/// Used when the platform's content store is not reachable from this
/// process and existence is enforced upstream.
#[derive(Debug, Clone)]
pub struct KnownKindsResolver {
    kinds: BTreeSet<String>,
}

impl KnownKindsResolver {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ContentResolver for KnownKindsResolver {
    async fn resolve(&self, _owner_id: Uuid, content: &ContentRef) -> Result<(), ContentError> {
        if self.kinds.contains(content.kind()) {
            Ok(())
        } else {
            Err(ContentError::UnknownKind(content.kind().to_string()))
        }
    }
}
