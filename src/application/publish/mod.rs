//! Publish pipeline: handler capability, registry and the attempt state machine.

pub mod handler;
pub mod locator;
pub mod registry;
pub mod service;

pub use handler::{HandlerError, HandlerFactory, PublishHandler, handler_factory};
pub use locator::LocatorTable;
pub use registry::{HandlerRegistry, ResolveError};
pub use service::{AttemptOutcome, AttemptReport, PublishError, PublishService, SkipReason};
