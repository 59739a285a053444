use crate::{
    auth::{policy, AuthUser},
    commands::transfers::create_transfer_command::unwrap_transaction_error,
    commands::Command,
    db::DbPool,
    entities::{
        stock_movement::MovementReason,
        transfer::{self, Entity as Transfer, TransferStatus},
        transfer_item::{self, Entity as TransferItem},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, MovementContext, StockOwner},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Seller acceptance of an incoming transfer: the in-flight units become
/// seller stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptTransferCommand {
    pub actor: AuthUser,
    pub transfer_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptTransferResult {
    pub transfer_id: Uuid,
    pub status: TransferStatus,
    pub items_moved: i32,
    pub processed_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for AcceptTransferCommand {
    type Result = AcceptTransferResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let (result, seller_id) = self.accept_in_db(db).await?;

        info!(
            transfer_id = %result.transfer_id,
            items_moved = result.items_moved,
            "transfer accepted"
        );
        event_sender
            .send_post_commit(Event::TransferAccepted {
                transfer_id: result.transfer_id,
                seller_id,
                items_moved: result.items_moved,
            })
            .await;

        Ok(result)
    }
}

impl AcceptTransferCommand {
    async fn accept_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(AcceptTransferResult, Uuid), ServiceError> {
        let actor = self.actor.clone();
        let transfer_id = self.transfer_id;

        db.transaction::<_, (AcceptTransferResult, Uuid), ServiceError>(move |txn| {
            Box::pin(async move {
                let transfer = Transfer::find_by_id(transfer_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
                    })?;
                policy::ensure_transfer_recipient(&actor, &transfer)?;

                let now = Utc::now();
                // Guarded flip: only one accept/reject can win the race.
                let flipped = Transfer::update_many()
                    .col_expr(
                        transfer::Column::Status,
                        Expr::value(TransferStatus::Accepted),
                    )
                    .col_expr(transfer::Column::ProcessedAt, Expr::value(now))
                    .filter(transfer::Column::Id.eq(transfer_id))
                    .filter(transfer::Column::Status.eq(TransferStatus::Created))
                    .exec(txn)
                    .await?;
                if flipped.rows_affected == 0 {
                    return Err(ServiceError::InvalidStateTransition {
                        entity: "transfer",
                        id: transfer_id,
                        current: transfer.status.as_str().to_string(),
                    });
                }

                let mut items = TransferItem::find()
                    .filter(transfer_item::Column::TransferId.eq(transfer_id))
                    .all(txn)
                    .await?;
                items.sort_by_key(|i| i.product_id);

                for item in &items {
                    ledger::credit(
                        txn,
                        StockOwner::Seller(transfer.seller_id),
                        item.product_id,
                        item.quantity,
                        MovementContext {
                            reason: MovementReason::AcceptIncoming,
                            related_entity_id: Some(transfer_id),
                            actor_id: actor.user_id,
                        },
                    )
                    .await?;
                }

                Ok((
                    AcceptTransferResult {
                        transfer_id,
                        status: TransferStatus::Accepted,
                        items_moved: items.len() as i32,
                        processed_at: now,
                    },
                    transfer.seller_id,
                ))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
