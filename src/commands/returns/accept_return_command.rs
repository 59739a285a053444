use crate::{
    auth::{policy, AuthUser},
    commands::transfers::create_transfer_command::unwrap_transaction_error,
    commands::Command,
    db::DbPool,
    entities::{
        return_item::{self, Entity as ReturnItem},
        return_request::{self, Entity as ReturnRequest, ReturnStatus},
        stock_movement::MovementReason,
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

/// Company confirmation of a devolution: the stock finally moves, seller
/// debit and company credit in one transaction.
///
/// The seller may have sold units since raising the request, so the stock
/// check runs again here and the whole acceptance fails itemized when the
/// seller no longer holds the quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptReturnCommand {
    pub actor: AuthUser,
    pub return_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptReturnResult {
    pub return_id: Uuid,
    pub status: ReturnStatus,
    pub items_moved: i32,
    pub processed_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for AcceptReturnCommand {
    type Result = AcceptReturnResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let (result, seller_id) = self.accept_in_db(db).await?;

        info!(
            return_id = %result.return_id,
            items_moved = result.items_moved,
            "return accepted"
        );
        event_sender
            .send_post_commit(Event::ReturnAccepted {
                return_id: result.return_id,
                seller_id,
                items_moved: result.items_moved,
            })
            .await;

        Ok(result)
    }
}

impl AcceptReturnCommand {
    async fn accept_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(AcceptReturnResult, Uuid), ServiceError> {
        let actor = self.actor.clone();
        let return_id = self.return_id;

        db.transaction::<_, (AcceptReturnResult, Uuid), ServiceError>(move |txn| {
            Box::pin(async move {
                let ret = ReturnRequest::find_by_id(return_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Return {} not found", return_id))
                    })?;
                policy::ensure_return_processor(&actor, &ret)?;

                let mut items = ReturnItem::find()
                    .filter(return_item::Column::ReturnId.eq(return_id))
                    .all(txn)
                    .await?;
                // Fixed lock order across concurrent acceptances.
                items.sort_by_key(|i| i.product_id);

                // Re-check seller holdings before moving anything so the
                // failure lists every short line.
                let requested: Vec<(Uuid, i32)> =
                    items.iter().map(|i| (i.product_id, i.quantity)).collect();
                let shortages =
                    ledger::shortages_for(txn, StockOwner::Seller(ret.seller_id), &requested)
                        .await?;
                if !shortages.is_empty() {
                    return Err(ServiceError::InsufficientStock(shortages));
                }

                let now = Utc::now();
                let flipped = ReturnRequest::update_many()
                    .col_expr(
                        return_request::Column::Status,
                        Expr::value(ReturnStatus::Accepted),
                    )
                    .col_expr(return_request::Column::ProcessedAt, Expr::value(now))
                    .col_expr(
                        return_request::Column::ProcessedBy,
                        Expr::value(actor.user_id),
                    )
                    .filter(return_request::Column::Id.eq(return_id))
                    .filter(return_request::Column::Status.eq(ReturnStatus::AwaitingConfirmation))
                    .exec(txn)
                    .await?;
                if flipped.rows_affected == 0 {
                    return Err(ServiceError::InvalidStateTransition {
                        entity: "return",
                        id: return_id,
                        current: ret.status.as_str().to_string(),
                    });
                }

                for item in &items {
                    let movement = MovementContext {
                        reason: MovementReason::ReturnAccept,
                        related_entity_id: Some(return_id),
                        actor_id: actor.user_id,
                    };
                    ledger::debit(
                        txn,
                        StockOwner::Seller(ret.seller_id),
                        item.product_id,
                        item.quantity,
                        movement,
                    )
                    .await?;
                    ledger::credit(
                        txn,
                        StockOwner::Company(ret.company_id),
                        item.product_id,
                        item.quantity,
                        movement,
                    )
                    .await?;
                }

                Ok((
                    AcceptReturnResult {
                        return_id,
                        status: ReturnStatus::Accepted,
                        items_moved: items.len() as i32,
                        processed_at: now,
                    },
                    ret.seller_id,
                ))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
