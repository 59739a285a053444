use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One balance row per (owner, product); created on first credit.
        manager
            .create_table(
                Table::create()
                    .table(InventoryBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryBalances::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::OwnerType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBalances::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryBalances::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_balances_owner_product")
                    .table(InventoryBalances::Table)
                    .col(InventoryBalances::OwnerType)
                    .col(InventoryBalances::OwnerId)
                    .col(InventoryBalances::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Append-only movement log; one row per balance mutation.
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::OwnerType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::OwnerId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::Delta).integer().not_null())
                    .col(
                        ColumnDef::new(StockMovements::Reason)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::RelatedEntityId).uuid().null())
                    .col(ColumnDef::new(StockMovements::ActorId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_owner_product")
                    .table(StockMovements::Table)
                    .col(StockMovements::OwnerType)
                    .col(StockMovements::OwnerId)
                    .col(StockMovements::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_related")
                    .table(StockMovements::Table)
                    .col(StockMovements::RelatedEntityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryBalances::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum InventoryBalances {
    Table,
    Id,
    OwnerType,
    OwnerId,
    ProductId,
    Quantity,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StockMovements {
    Table,
    Id,
    OwnerType,
    OwnerId,
    ProductId,
    Delta,
    Reason,
    RelatedEntityId,
    ActorId,
    CreatedAt,
}
