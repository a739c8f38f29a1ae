//! Docflow: rule-based document triage and action routing.

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod store;
pub mod summary;
