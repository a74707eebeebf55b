//! Migration to create the post_statuses table.
//!
//! Tenant-scoped workflow states for posts; remote status options are mapped
//! onto these ids through the integration config.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PostStatuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PostStatuses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PostStatuses::TenantId).uuid().not_null())
                    .col(ColumnDef::new(PostStatuses::Name).text().not_null())
                    .col(
                        ColumnDef::new(PostStatuses::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_post_statuses_tenant_id")
                            .from(PostStatuses::Table, PostStatuses::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PostStatuses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PostStatuses {
    Table,
    Id,
    TenantId,
    Name,
    SortOrder,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
