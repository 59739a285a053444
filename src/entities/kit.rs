use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum KitStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl KitStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, KitStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KitStatus::Pending => "pending",
            KitStatus::Accepted => "accepted",
            KitStatus::Rejected => "rejected",
        }
    }
}

/// A daily stock batch assigned to a seller, with the commission context
/// frozen at assignment time.
///
/// `accepted_at` is set exactly once, on the pending -> accepted transition;
/// commission reporting keys off it, not off `assigned_at`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub seller_id: Uuid,
    pub created_by: Uuid,
    pub kit_date: Date,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub commission_percent: Decimal,
    pub status: KitStatus,
    pub rejection_reason: Option<String>,
    pub assigned_at: DateTimeUtc,
    pub accepted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::kit_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
}

impl Related<super::kit_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
