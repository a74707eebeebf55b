//! # Feedback Integrations Library
//!
//! Sync engine linking feedback boards to third-party tools: provider
//! adapters, mapping storage, the per-run orchestrator, conflict
//! resolution, and the cron runner, plus the HTTP surface around them.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod server;
pub mod sync;
pub mod telemetry;
pub use migration;
