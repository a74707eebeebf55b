//! Migration to create the boards table.
//!
//! Boards are the tenant-scoped containers feedback posts live in; inbound
//! sync targets a board chosen in the integration config.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Boards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Boards::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Boards::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Boards::Name).text().not_null())
                    .col(ColumnDef::new(Boards::Slug).text().not_null())
                    .col(
                        ColumnDef::new(Boards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boards_tenant_id")
                            .from(Boards::Table, Boards::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_boards_tenant_slug")
                    .table(Boards::Table)
                    .col(Boards::TenantId)
                    .col(Boards::Slug)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_boards_tenant_slug").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boards::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Boards {
    Table,
    Id,
    TenantId,
    Name,
    Slug,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
