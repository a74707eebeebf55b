//! Database migrations for the feedback integrations service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_06_01_100000_create_tenants;
mod m2026_06_01_100100_create_boards;
mod m2026_06_01_100200_create_post_statuses;
mod m2026_06_01_100300_create_posts;
mod m2026_06_01_100400_create_integrations;
mod m2026_06_01_100500_create_integration_mappings;
mod m2026_06_01_100600_create_integration_sync_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_06_01_100000_create_tenants::Migration),
            Box::new(m2026_06_01_100100_create_boards::Migration),
            Box::new(m2026_06_01_100200_create_post_statuses::Migration),
            Box::new(m2026_06_01_100300_create_posts::Migration),
            Box::new(m2026_06_01_100400_create_integrations::Migration),
            Box::new(m2026_06_01_100500_create_integration_mappings::Migration),
            Box::new(m2026_06_01_100600_create_integration_sync_logs::Migration),
        ]
    }
}
