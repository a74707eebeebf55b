//! Migration to create the integration_mappings table.
//!
//! One row links a local entity to a remote item within one integration. The
//! unique index on (integration_id, local_type, local_id) is the safety net
//! against two runs double-linking the same post.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IntegrationMappings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntegrationMappings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::IntegrationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::LocalType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::LocalId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::RemoteId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::LastError)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::Metadata)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IntegrationMappings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integration_mappings_integration_id")
                            .from(
                                IntegrationMappings::Table,
                                IntegrationMappings::IntegrationId,
                            )
                            .to(Integrations::Table, Integrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_integration_mappings_local_unique")
                    .table(IntegrationMappings::Table)
                    .col(IntegrationMappings::IntegrationId)
                    .col(IntegrationMappings::LocalType)
                    .col(IntegrationMappings::LocalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Remote ids are only unique within one integration.
        manager
            .create_index(
                Index::create()
                    .name("idx_integration_mappings_remote")
                    .table(IntegrationMappings::Table)
                    .col(IntegrationMappings::IntegrationId)
                    .col(IntegrationMappings::RemoteId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_integration_mappings_local_unique")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_integration_mappings_remote")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(IntegrationMappings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IntegrationMappings {
    Table,
    Id,
    IntegrationId,
    LocalType,
    LocalId,
    RemoteId,
    Status,
    LastSyncedAt,
    LastError,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Integrations {
    Table,
    Id,
}
