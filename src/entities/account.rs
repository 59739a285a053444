use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Billing plan tiers. Only the free solo tier carries a sales ceiling;
/// paid tiers are unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[sea_orm(string_value = "solo_free")]
    SoloFree,
    #[sea_orm(string_value = "solo_pro")]
    SoloPro,
    #[sea_orm(string_value = "team")]
    Team,
}

impl PlanTier {
    pub fn is_limited(&self) -> bool {
        matches!(self, PlanTier::SoloFree)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub plan: PlanTier,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::company::Entity")]
    Companies,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
