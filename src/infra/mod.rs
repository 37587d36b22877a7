//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod handlers;
pub mod http;
pub mod telemetry;
