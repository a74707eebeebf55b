//! # Repository Layer
//!
//! Repository implementations encapsulating SeaORM operations for the sync
//! engine's tables.

pub mod integration;
pub mod mapping;
pub mod post;
pub mod sync_log;

pub use integration::IntegrationRepository;
pub use mapping::MappingRepository;
pub use post::PostRepository;
pub use sync_log::{RunSummary, SyncLogRepository};
