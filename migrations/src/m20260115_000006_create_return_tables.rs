use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Returns::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Returns::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Returns::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Returns::SellerId).uuid().not_null())
                    .col(ColumnDef::new(Returns::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Returns::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Returns::TotalItems).integer().not_null())
                    .col(ColumnDef::new(Returns::Notes).text().null())
                    .col(ColumnDef::new(Returns::RejectionReason).text().null())
                    .col(
                        ColumnDef::new(Returns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Returns::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Returns::ProcessedBy).uuid().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_returns_company_created")
                    .table(Returns::Table)
                    .col(Returns::CompanyId)
                    .col(Returns::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_returns_seller")
                    .table(Returns::Table)
                    .col(Returns::SellerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReturnItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReturnItems::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReturnItems::ReturnId).uuid().not_null())
                    .col(ColumnDef::new(ReturnItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(ReturnItems::Quantity).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_return_items_return")
                            .from(ReturnItems::Table, ReturnItems::ReturnId)
                            .to(Returns::Table, Returns::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_return_items_return")
                    .table(ReturnItems::Table)
                    .col(ReturnItems::ReturnId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReturnItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Returns::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Returns {
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
    ProcessedBy,
}

#[derive(DeriveIden)]
enum ReturnItems {
    Table,
    Id,
    ReturnId,
    ProductId,
    Quantity,
}
