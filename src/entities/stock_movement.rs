use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::inventory_balance::OwnerType;

/// Why a balance changed. Closed set; reconciliation sums movements per
/// reason to audit the conservation law.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Units issued into the company's central stock.
    #[sea_orm(string_value = "stock_receipt")]
    StockReceipt,
    /// Company debit when a transfer is created.
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    /// Seller credit when a transfer is accepted.
    #[sea_orm(string_value = "accept_incoming")]
    AcceptIncoming,
    /// Company credit when a transfer is rejected or canceled.
    #[sea_orm(string_value = "reject_incoming")]
    RejectIncoming,
    /// Company debit when a kit is assigned.
    #[sea_orm(string_value = "kit_out")]
    KitOut,
    /// Seller credit when a kit is accepted.
    #[sea_orm(string_value = "kit_accept")]
    KitAccept,
    /// Company credit when a kit is rejected.
    #[sea_orm(string_value = "kit_reject")]
    KitReject,
    /// Seller debit and company credit when a return is accepted.
    #[sea_orm(string_value = "return_accept")]
    ReturnAccept,
}

/// Append-only audit trail of every balance change.
///
/// Rows are written in the same transaction as the balance mutation they
/// record, and are never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_type: OwnerType,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub delta: i32,
    pub reason: MovementReason,
    pub related_entity_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub created_at: DateTimeUtc,
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
