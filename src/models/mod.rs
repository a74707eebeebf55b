//! # Data Models
//!
//! SeaORM entities for the feedback integrations service, plus the shared
//! string enums used by the sync engine (provider, direction, statuses).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod board;
pub mod integration;
pub mod integration_mapping;
pub mod integration_sync_log;
pub mod post;
pub mod post_status;
pub mod tenant;

pub use board::Entity as Board;
pub use integration::Entity as Integration;
pub use integration_mapping::Entity as IntegrationMapping;
pub use integration_sync_log::Entity as IntegrationSyncLog;
pub use post::Entity as Post;
pub use post_status::Entity as PostStatus;
pub use tenant::Entity as Tenant;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "feedback-integrations".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
