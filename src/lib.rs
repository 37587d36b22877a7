//! inkwire: dispatches blog content to user-configured external integrations
//! and records every attempt.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
