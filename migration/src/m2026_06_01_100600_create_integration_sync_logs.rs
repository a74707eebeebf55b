//! Migration to create the integration_sync_logs table.
//!
//! Append-only rows, one per synchronized item or phase marker, grouped by
//! sync_run_id. Deleted only by cascade when the integration goes away.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IntegrationSyncLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::IntegrationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::MappingId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::SyncRunId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::Direction)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::Status)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::Message)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::Details)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationSyncLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integration_sync_logs_integration_id")
                            .from(
                                IntegrationSyncLogs::Table,
                                IntegrationSyncLogs::IntegrationId,
                            )
                            .to(Integrations::Table, Integrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_integration_sync_logs_mapping_id")
                            .from(IntegrationSyncLogs::Table, IntegrationSyncLogs::MappingId)
                            .to(IntegrationMappings::Table, IntegrationMappings::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_integration_sync_logs_run")
                    .table(IntegrationSyncLogs::Table)
                    .col(IntegrationSyncLogs::IntegrationId)
                    .col(IntegrationSyncLogs::SyncRunId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_integration_sync_logs_run")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(IntegrationSyncLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IntegrationSyncLogs {
    Table,
    Id,
    IntegrationId,
    MappingId,
    SyncRunId,
    Direction,
    Status,
    Message,
    Details,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Integrations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum IntegrationMappings {
    Table,
    Id,
}
