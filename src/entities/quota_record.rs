use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::account::PlanTier;

/// Per-account, per-month count of confirmed sales.
///
/// Created lazily on the first check or sale of the month. `monthly_limit`
/// and `plan` are snapshots taken at creation for audit; enforcement always
/// reads the account's current plan.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quota_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: Uuid,
    pub year_month: String,
    pub sales_count: i32,
    pub monthly_limit: i32,
    pub plan: PlanTier,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
