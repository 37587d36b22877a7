use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{DefinitionsRepo, RepoError};
use crate::domain::entities::IntegrationDefinitionRecord;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("integration definition `{0}` not found")]
    UnknownCode(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Read access to the integration-definition catalog.
#[derive(Clone)]
pub struct CatalogService {
    definitions: Arc<dyn DefinitionsRepo>,
}

impl CatalogService {
    pub fn new(definitions: Arc<dyn DefinitionsRepo>) -> Self {
        Self { definitions }
    }

    pub async fn list_active(&self) -> Result<Vec<IntegrationDefinitionRecord>, CatalogError> {
        self.definitions
            .list_active()
            .await
            .map_err(CatalogError::from)
    }

    pub async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<IntegrationDefinitionRecord, CatalogError> {
        self.definitions
            .find_by_code(code)
            .await?
            .ok_or_else(|| CatalogError::UnknownCode(code.to_string()))
    }

    /// Definitions are retired, never deleted.
    pub async fn deactivate(&self, code: &str) -> Result<(), CatalogError> {
        if !self.definitions.deactivate(code).await? {
            return Err(CatalogError::UnknownCode(code.to_string()));
        }
        info!(
            target = "application::catalog::deactivate",
            code,
            "integration definition deactivated"
        );
        Ok(())
    }
}
