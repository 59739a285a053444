use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which side of the ledger a balance row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    #[sea_orm(string_value = "company")]
    Company,
    #[sea_orm(string_value = "seller")]
    Seller,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Company => "company",
            OwnerType::Seller => "seller",
        }
    }
}

/// Authoritative stock balance per (owner, product).
///
/// One row per owner/product pair, created on the first credit and never
/// deleted. `quantity` must never go negative; `version` is bumped on every
/// write so racing updates are observable.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_balances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_type: OwnerType,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
