use std::collections::HashMap;
use std::fmt;

use super::handler::HandlerFactory;

/// Startup-built table mapping definition locator strings to handler
/// factories.
///
/// Definitions name their handler by locator. Only locators installed here
/// can be resolved; anything else is a resolution failure.
#[derive(Clone, Default)]
pub struct LocatorTable {
    entries: HashMap<String, HandlerFactory>,
}

impl LocatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Into<String>, factory: HandlerFactory) -> Self {
        self.insert(locator, factory);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, factory: HandlerFactory) {
        self.entries.insert(locator.into(), factory);
    }

    pub fn get(&self, locator: &str) -> Option<HandlerFactory> {
        self.entries.get(locator).cloned()
    }
}

impl fmt::Debug for LocatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut locators: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        locators.sort_unstable();
        f.debug_struct("LocatorTable")
            .field("locators", &locators)
            .finish()
    }
}
