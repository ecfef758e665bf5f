//! Notification dispatch core: templated, capability-gated delivery of domain
//! events to pluggable providers, with a retry queue and provider health checks.

pub mod api;
pub mod bus;
pub mod clients;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod providers;
pub mod queue;
pub mod service;
pub mod templates;
pub mod utils;

pub use error::{NotificationError, Result};
