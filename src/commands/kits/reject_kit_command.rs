use crate::{
    auth::{policy, AuthUser},
    commands::transfers::create_transfer_command::unwrap_transaction_error,
    commands::Command,
    db::DbPool,
    entities::{
        kit::{self, Entity as Kit, KitStatus},
        kit_item::{self, Entity as KitItem},
        stock_movement::MovementReason,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, MovementContext, StockOwner},
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Seller rejection of an assigned kit: the assignment debit is reversed
/// and the kit never contributes to commission.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectKitCommand {
    pub actor: AuthUser,
    pub kit_id: Uuid,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectKitResult {
    pub kit_id: Uuid,
    pub status: KitStatus,
    pub items_moved: i32,
}

#[async_trait::async_trait]
impl Command for RejectKitCommand {
    type Result = RejectKitResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let (result, seller_id) = self.reject_in_db(db).await?;

        info!(kit_id = %result.kit_id, "kit rejected");
        event_sender
            .send_post_commit(Event::KitRejected {
                kit_id: result.kit_id,
                seller_id,
            })
            .await;

        Ok(result)
    }
}

impl RejectKitCommand {
    async fn reject_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(RejectKitResult, Uuid), ServiceError> {
        let actor = self.actor.clone();
        let kit_id = self.kit_id;
        let reason = self.reason.clone();

        db.transaction::<_, (RejectKitResult, Uuid), ServiceError>(move |txn| {
            Box::pin(async move {
                let kit_row = Kit::find_by_id(kit_id).one(txn).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("Kit {} not found", kit_id))
                })?;
                policy::ensure_kit_recipient(&actor, &kit_row)?;

                let flipped = Kit::update_many()
                    .col_expr(kit::Column::Status, Expr::value(KitStatus::Rejected))
                    .col_expr(kit::Column::RejectionReason, Expr::value(reason))
                    .filter(kit::Column::Id.eq(kit_id))
                    .filter(kit::Column::Status.eq(KitStatus::Pending))
                    .exec(txn)
                    .await?;
                if flipped.rows_affected == 0 {
                    return Err(ServiceError::InvalidStateTransition {
                        entity: "kit",
                        id: kit_id,
                        current: kit_row.status.as_str().to_string(),
                    });
                }

                let mut items = KitItem::find()
                    .filter(kit_item::Column::KitId.eq(kit_id))
                    .all(txn)
                    .await?;
                items.sort_by_key(|i| i.product_id);

                // Reverse the assignment debit.
                for item in &items {
                    ledger::credit(
                        txn,
                        StockOwner::Company(kit_row.company_id),
                        item.product_id,
                        item.qty_assigned,
                        MovementContext {
                            reason: MovementReason::KitReject,
                            related_entity_id: Some(kit_id),
                            actor_id: actor.user_id,
                        },
                    )
                    .await?;
                }

                Ok((
                    RejectKitResult {
                        kit_id,
                        status: KitStatus::Rejected,
                        items_moved: items.len() as i32,
                    },
                    kit_row.seller_id,
                ))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
