use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Kits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Kits::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Kits::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Kits::SellerId).uuid().not_null())
                    .col(ColumnDef::new(Kits::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Kits::KitDate).date().not_null())
                    .col(
                        ColumnDef::new(Kits::CommissionPercent)
                            .decimal_len(5, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Kits::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Kits::RejectionReason).text().null())
                    .col(
                        ColumnDef::new(Kits::AssignedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Kits::AcceptedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_kits_seller_date")
                    .table(Kits::Table)
                    .col(Kits::SellerId)
                    .col(Kits::KitDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KitItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KitItems::Id)
                            .big_integer()
                            .primary_key()
                            .auto_increment()
                            .not_null(),
                    )
                    .col(ColumnDef::new(KitItems::KitId).uuid().not_null())
                    .col(ColumnDef::new(KitItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(KitItems::QtyAssigned).integer().not_null())
                    .col(
                        ColumnDef::new(KitItems::UnitPrice)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_kit_items_kit")
                            .from(KitItems::Table, KitItems::KitId)
                            .to(Kits::Table, Kits::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_kit_items_kit")
                    .table(KitItems::Table)
                    .col(KitItems::KitId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(KitItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Kits::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Kits {
    Table,
    Id,
    CompanyId,
    SellerId,
    CreatedBy,
    KitDate,
    CommissionPercent,
    Status,
    RejectionReason,
    AssignedAt,
    AcceptedAt,
}

#[derive(DeriveIden)]
enum KitItems {
    Table,
    Id,
    KitId,
    ProductId,
    QtyAssigned,
    UnitPrice,
}
