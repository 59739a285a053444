use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::SellerId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Transfers::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Transfers::TotalItems).integer().not_null())
                    .col(ColumnDef::new(Transfers::Notes).text().null())
                    .col(ColumnDef::new(Transfers::RejectionReason).text().null())
                    .col(
                        ColumnDef::new(Transfers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transfers::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_company_created")
                    .table(Transfers::Table)
                    .col(Transfers::CompanyId)
                    .col(Transfers::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfers_seller")
                    .table(Transfers::Table)
                    .col(Transfers::SellerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransferItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransferItems::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransferItems::TransferId).uuid().not_null())
                    .col(ColumnDef::new(TransferItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(TransferItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(TransferItems::UnitPrice)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transfer_items_transfer")
                            .from(TransferItems::Table, TransferItems::TransferId)
                            .to(Transfers::Table, Transfers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transfer_items_transfer")
                    .table(TransferItems::Table)
                    .col(TransferItems::TransferId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransferItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Transfers {
    Table,
    Id,
    CompanyId,
    SellerId,
    CreatedBy,
    Status,
    TotalItems,
    Notes,
    RejectionReason,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveIden)]
enum TransferItems {
    Table,
    Id,
    TransferId,
    ProductId,
    Quantity,
    UnitPrice,
}
