pub use sea_orm_migration::prelude::*;

mod m20260115_000001_create_identity_tables;
mod m20260115_000002_create_products_table;
mod m20260115_000003_create_inventory_tables;
mod m20260115_000004_create_transfer_tables;
mod m20260115_000005_create_kit_tables;
mod m20260115_000006_create_return_tables;
mod m20260115_000007_create_quota_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260115_000001_create_identity_tables::Migration),
            Box::new(m20260115_000002_create_products_table::Migration),
            Box::new(m20260115_000003_create_inventory_tables::Migration),
            Box::new(m20260115_000004_create_transfer_tables::Migration),
            Box::new(m20260115_000005_create_kit_tables::Migration),
            Box::new(m20260115_000006_create_return_tables::Migration),
            Box::new(m20260115_000007_create_quota_tables::Migration),
        ]
    }
}
