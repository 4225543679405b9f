//! Create vapid_key table for the server push signing key pair.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VapidKey::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VapidKey::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VapidKey::PublicKey).text().not_null())
                    .col(ColumnDef::new(VapidKey::PrivateKey).text().not_null())
                    .col(
                        ColumnDef::new(VapidKey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VapidKey::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VapidKey::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum VapidKey {
    Table,
    Id,
    PublicKey,
    PrivateKey,
    CreatedAt,
    UpdatedAt,
}
