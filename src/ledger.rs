//! Inventory ledger: the only code allowed to change a stock balance.
//!
//! Balances live in `inventory_balances`, one row per (owner, product).
//! Every mutation writes its paired `stock_movements` row on the same
//! connection, so callers composing ledger operations inside a transaction
//! get the balance change and the audit entry atomically.
//!
//! Debits use a guarded single-statement UPDATE (`quantity >= qty` in the
//! WHERE clause). Two writers racing on the same row serialize on the row
//! lock, and the loser's guard fails instead of overdrawing the balance.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, RuntimeErr, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::inventory_balance::{self, Entity as InventoryBalance, OwnerType};
use crate::entities::stock_movement::{self, MovementReason};
use crate::errors::{ServiceError, StockShortage};

/// A balance-row owner: the company's central stock or one seller's
/// sub-inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOwner {
    Company(Uuid),
    Seller(Uuid),
}

impl StockOwner {
    pub fn owner_type(&self) -> OwnerType {
        match self {
            StockOwner::Company(_) => OwnerType::Company,
            StockOwner::Seller(_) => OwnerType::Seller,
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            StockOwner::Company(id) | StockOwner::Seller(id) => *id,
        }
    }
}

/// Audit context attached to every movement row.
#[derive(Debug, Clone, Copy)]
pub struct MovementContext {
    pub reason: MovementReason,
    pub related_entity_id: Option<Uuid>,
    pub actor_id: Uuid,
}

/// Current balance for (owner, product); zero when no row exists yet.
pub async fn balance_of<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    product_id: Uuid,
) -> Result<i32, ServiceError> {
    let row = find_balance(conn, owner, product_id).await?;
    Ok(row.map(|b| b.quantity).unwrap_or(0))
}

/// Batch stock pre-check: every requested (product, quantity) the owner
/// cannot cover, reported together so callers can fail itemized.
pub async fn shortages_for<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    requested: &[(Uuid, i32)],
) -> Result<Vec<StockShortage>, ServiceError> {
    let mut shortages = Vec::new();
    for (product_id, quantity) in requested {
        let available = balance_of(conn, owner, *product_id).await?;
        if available < *quantity {
            shortages.push(StockShortage {
                product_id: *product_id,
                requested: *quantity,
                available,
            });
        }
    }
    Ok(shortages)
}

/// Removes `qty` units from the owner's balance and logs the movement.
///
/// Fails with an itemized `InsufficientStock` when the balance cannot cover
/// the debit; the caller's transaction is expected to abort, leaving no
/// partial state.
pub async fn debit<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    product_id: Uuid,
    qty: i32,
    movement: MovementContext,
) -> Result<(), ServiceError> {
    ensure_positive(qty)?;

    let result = InventoryBalance::update_many()
        .col_expr(
            inventory_balance::Column::Quantity,
            Expr::col(inventory_balance::Column::Quantity).sub(qty),
        )
        .col_expr(
            inventory_balance::Column::Version,
            Expr::col(inventory_balance::Column::Version).add(1),
        )
        .col_expr(
            inventory_balance::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(inventory_balance::Column::OwnerType.eq(owner.owner_type()))
        .filter(inventory_balance::Column::OwnerId.eq(owner.owner_id()))
        .filter(inventory_balance::Column::ProductId.eq(product_id))
        .filter(inventory_balance::Column::Quantity.gte(qty))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        // Either the row is missing or the guard failed; re-read to report
        // the actual availability.
        let available = balance_of(conn, owner, product_id).await?;
        return Err(ServiceError::InsufficientStock(vec![StockShortage {
            product_id,
            requested: qty,
            available,
        }]));
    }

    record_movement(conn, owner, product_id, -qty, movement).await?;

    debug!(
        owner_type = owner.owner_type().as_str(),
        owner_id = %owner.owner_id(),
        product_id = %product_id,
        qty = qty,
        "debited stock"
    );
    Ok(())
}

/// Adds `qty` units to the owner's balance and logs the movement. The
/// balance row is created on first credit.
pub async fn credit<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    product_id: Uuid,
    qty: i32,
    movement: MovementContext,
) -> Result<(), ServiceError> {
    ensure_positive(qty)?;

    let updated = credit_existing(conn, owner, product_id, qty).await?;
    if !updated {
        let now = Utc::now();
        let fresh = inventory_balance::ActiveModel {
            owner_type: Set(owner.owner_type()),
            owner_id: Set(owner.owner_id()),
            product_id: Set(product_id),
            quantity: Set(qty),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match fresh.insert(conn).await {
            Ok(_) => {}
            // A concurrent first credit can win the insert; fall back to the
            // update path against the now-existing row.
            Err(err) if is_unique_violation(&err) => {
                if !credit_existing(conn, owner, product_id, qty).await? {
                    return Err(ServiceError::InternalError(format!(
                        "balance row for product {} vanished during credit",
                        product_id
                    )));
                }
            }
            Err(err) => return Err(ServiceError::DatabaseError(err)),
        }
    }

    record_movement(conn, owner, product_id, qty, movement).await?;

    debug!(
        owner_type = owner.owner_type().as_str(),
        owner_id = %owner.owner_id(),
        product_id = %product_id,
        qty = qty,
        "credited stock"
    );
    Ok(())
}

async fn find_balance<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    product_id: Uuid,
) -> Result<Option<inventory_balance::Model>, ServiceError> {
    InventoryBalance::find()
        .filter(inventory_balance::Column::OwnerType.eq(owner.owner_type()))
        .filter(inventory_balance::Column::OwnerId.eq(owner.owner_id()))
        .filter(inventory_balance::Column::ProductId.eq(product_id))
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)
}

async fn credit_existing<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    product_id: Uuid,
    qty: i32,
) -> Result<bool, ServiceError> {
    let result = InventoryBalance::update_many()
        .col_expr(
            inventory_balance::Column::Quantity,
            Expr::col(inventory_balance::Column::Quantity).add(qty),
        )
        .col_expr(
            inventory_balance::Column::Version,
            Expr::col(inventory_balance::Column::Version).add(1),
        )
        .col_expr(
            inventory_balance::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(inventory_balance::Column::OwnerType.eq(owner.owner_type()))
        .filter(inventory_balance::Column::OwnerId.eq(owner.owner_id()))
        .filter(inventory_balance::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    owner: StockOwner,
    product_id: Uuid,
    delta: i32,
    movement: MovementContext,
) -> Result<(), ServiceError> {
    let entry = stock_movement::ActiveModel {
        owner_type: Set(owner.owner_type()),
        owner_id: Set(owner.owner_id()),
        product_id: Set(product_id),
        delta: Set(delta),
        reason: Set(movement.reason),
        related_entity_id: Set(movement.related_entity_id),
        actor_id: Set(movement.actor_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    entry.insert(conn).await?;
    Ok(())
}

fn ensure_positive(qty: i32) -> Result<(), ServiceError> {
    if qty <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "quantity must be positive, got {}",
            qty
        )));
    }
    Ok(())
}

/// Best-effort unique-constraint detection across the supported backends.
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    match err {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(e)) | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(e)) => {
            let msg = e.to_string().to_ascii_lowercase();
            msg.contains("unique") || msg.contains("duplicate")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert_matches!(ensure_positive(0), Err(ServiceError::ValidationError(_)));
        assert_matches!(ensure_positive(-5), Err(ServiceError::ValidationError(_)));
        assert!(ensure_positive(1).is_ok());
    }

    #[test]
    fn stock_owner_accessors() {
        let id = Uuid::new_v4();
        assert_eq!(StockOwner::Company(id).owner_type(), OwnerType::Company);
        assert_eq!(StockOwner::Seller(id).owner_type(), OwnerType::Seller);
        assert_eq!(StockOwner::Seller(id).owner_id(), id);
    }
}
