//! Application services layer.

pub mod catalog;
pub mod content;
pub mod error;
pub mod integrations;
pub mod pagination;
pub mod publish;
pub mod repos;
pub mod targets;
