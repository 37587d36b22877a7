//! Maps integration-type codes to handler factories.
//!
//! Codes registered up front are served straight from the cache. Unknown
//! codes are looked up in the definition catalog and their locator is
//! resolved through the startup [`LocatorTable`]; a successful resolution is
//! cached for the lifetime of the registry. Two tasks racing on the same
//! uncached code may both hit the catalog; the later insert wins.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::repos::{DefinitionsRepo, RepoError};

use super::handler::{HandlerFactory, PublishHandler};
use super::locator::LocatorTable;

pub(crate) const METRIC_HANDLER_CACHE_MISS: &str = "inkwire_handler_cache_miss_total";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no integration definition with code `{code}`")]
    DefinitionNotFound { code: String },
    #[error("handler locator `{locator}` for definition `{code}` could not be resolved")]
    HandlerResolution { code: String, locator: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct HandlerRegistry {
    cache: DashMap<String, HandlerFactory>,
    definitions: Arc<dyn DefinitionsRepo>,
    locators: LocatorTable,
}

impl HandlerRegistry {
    pub fn new(definitions: Arc<dyn DefinitionsRepo>, locators: LocatorTable) -> Self {
        Self {
            cache: DashMap::new(),
            definitions,
            locators,
        }
    }

    /// Install `factory` for `code`, replacing any previous entry.
    pub fn register(&self, code: impl Into<String>, factory: HandlerFactory) {
        let code = code.into();
        if self.cache.insert(code.clone(), factory).is_some() {
            warn!(
                target = "application::publish::registry",
                code = %code,
                "overwriting registered publish handler"
            );
        }
    }

    /// Return a fresh handler instance for `code`.
    pub async fn resolve(&self, code: &str) -> Result<Box<dyn PublishHandler>, ResolveError> {
        let cached = self.cache.get(code).map(|entry| entry.value().clone());
        if let Some(factory) = cached {
            return Ok(factory());
        }

        counter!(METRIC_HANDLER_CACHE_MISS).increment(1);

        let definition = self.definitions.find_by_code(code).await?.ok_or_else(|| {
            ResolveError::DefinitionNotFound {
                code: code.to_string(),
            }
        })?;

        let factory = self
            .locators
            .get(&definition.handler_locator)
            .ok_or_else(|| ResolveError::HandlerResolution {
                code: code.to_string(),
                locator: definition.handler_locator.clone(),
            })?;

        self.cache.insert(code.to_string(), factory.clone());
        debug!(
            target = "application::publish::registry",
            code,
            locator = %definition.handler_locator,
            "cached publish handler"
        );

        Ok(factory())
    }

    pub fn is_cached(&self, code: &str) -> bool {
        self.cache.contains_key(code)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<String> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        codes.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("cached", &codes)
            .field("locators", &self.locators)
            .finish()
    }
}
