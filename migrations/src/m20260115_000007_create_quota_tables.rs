use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per (account, month), created lazily on first check/sale.
        manager
            .create_table(
                Table::create()
                    .table(QuotaRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotaRecords::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuotaRecords::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(QuotaRecords::YearMonth)
                            .string_len(7)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotaRecords::SalesCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(QuotaRecords::MonthlyLimit)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuotaRecords::Plan).string_len(32).not_null())
                    .col(
                        ColumnDef::new(QuotaRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotaRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quota_records_account_month")
                    .table(QuotaRecords::Table)
                    .col(QuotaRecords::AccountId)
                    .col(QuotaRecords::YearMonth)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Idempotency ledger: a sale id is counted at most once.
        manager
            .create_table(
                Table::create()
                    .table(QuotaSales::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotaSales::SaleId)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuotaSales::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(QuotaSales::YearMonth)
                            .string_len(7)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotaSales::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quota_sales_account")
                    .table(QuotaSales::Table)
                    .col(QuotaSales::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotaSales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(QuotaRecords::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum QuotaRecords {
    Table,
    Id,
    AccountId,
    YearMonth,
    SalesCount,
    MonthlyLimit,
    Plan,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum QuotaSales {
    Table,
    SaleId,
    AccountId,
    YearMonth,
    RecordedAt,
}
