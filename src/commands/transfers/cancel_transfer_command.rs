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
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Company-side retraction of a transfer the seller has not processed yet.
/// The in-flight units go back to central stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelTransferCommand {
    pub actor: AuthUser,
    pub transfer_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelTransferResult {
    pub transfer_id: Uuid,
    pub status: TransferStatus,
    pub items_moved: i32,
}

#[async_trait::async_trait]
impl Command for CancelTransferCommand {
    type Result = CancelTransferResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let result = self.cancel_in_db(db).await?;

        info!(transfer_id = %result.transfer_id, "transfer canceled");
        event_sender
            .send_post_commit(Event::TransferCanceled {
                transfer_id: result.transfer_id,
            })
            .await;

        Ok(result)
    }
}

impl CancelTransferCommand {
    async fn cancel_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<CancelTransferResult, ServiceError> {
        let actor = self.actor.clone();
        let transfer_id = self.transfer_id;

        db.transaction::<_, CancelTransferResult, ServiceError>(move |txn| {
            Box::pin(async move {
                let transfer = Transfer::find_by_id(transfer_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
                    })?;
                policy::ensure_company_manager(&actor, transfer.company_id)?;

                let flipped = Transfer::update_many()
                    .col_expr(
                        transfer::Column::Status,
                        Expr::value(TransferStatus::Canceled),
                    )
                    .col_expr(transfer::Column::ProcessedAt, Expr::value(Utc::now()))
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
                        StockOwner::Company(transfer.company_id),
                        item.product_id,
                        item.quantity,
                        MovementContext {
                            reason: MovementReason::RejectIncoming,
                            related_entity_id: Some(transfer_id),
                            actor_id: actor.user_id,
                        },
                    )
                    .await?;
                }

                Ok(CancelTransferResult {
                    transfer_id,
                    status: TransferStatus::Canceled,
                    items_moved: items.len() as i32,
                })
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
