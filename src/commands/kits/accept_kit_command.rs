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
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Seller acceptance of an assigned kit.
///
/// `accepted_at` is written here and only here; commission reporting keys
/// off the acceptance moment, not the assignment moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptKitCommand {
    pub actor: AuthUser,
    pub kit_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcceptKitResult {
    pub kit_id: Uuid,
    pub status: KitStatus,
    pub items_moved: i32,
    pub accepted_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for AcceptKitCommand {
    type Result = AcceptKitResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();
        let (result, seller_id) = self.accept_in_db(db).await?;

        info!(kit_id = %result.kit_id, items_moved = result.items_moved, "kit accepted");
        event_sender
            .send_post_commit(Event::KitAccepted {
                kit_id: result.kit_id,
                seller_id,
                accepted_at: result.accepted_at,
            })
            .await;

        Ok(result)
    }
}

impl AcceptKitCommand {
    async fn accept_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(AcceptKitResult, Uuid), ServiceError> {
        let actor = self.actor.clone();
        let kit_id = self.kit_id;

        db.transaction::<_, (AcceptKitResult, Uuid), ServiceError>(move |txn| {
            Box::pin(async move {
                let kit_row = Kit::find_by_id(kit_id).one(txn).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("Kit {} not found", kit_id))
                })?;
                policy::ensure_kit_recipient(&actor, &kit_row)?;

                let now = Utc::now();
                let flipped = Kit::update_many()
                    .col_expr(kit::Column::Status, Expr::value(KitStatus::Accepted))
                    .col_expr(kit::Column::AcceptedAt, Expr::value(now))
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

                for item in &items {
                    ledger::credit(
                        txn,
                        StockOwner::Seller(kit_row.seller_id),
                        item.product_id,
                        item.qty_assigned,
                        MovementContext {
                            reason: MovementReason::KitAccept,
                            related_entity_id: Some(kit_id),
                            actor_id: actor.user_id,
                        },
                    )
                    .await?;
                }

                Ok((
                    AcceptKitResult {
                        kit_id,
                        status: KitStatus::Accepted,
                        items_moved: items.len() as i32,
                        accepted_at: now,
                    },
                    kit_row.seller_id,
                ))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
