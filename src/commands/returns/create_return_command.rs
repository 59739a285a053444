use crate::{
    auth::{policy, AuthUser},
    commands::transfers::{validate_items, StockItemInput},
    commands::Command,
    db::DbPool,
    entities::{
        product::{self, Entity as Product},
        return_item,
        return_request::{self, ReturnStatus},
        seller::Entity as Seller,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, StockOwner},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Raises a devolution request for stock a seller currently holds.
///
/// Deliberately moves no stock: the company has not agreed to take the
/// units back yet, so the seller keeps them until acceptance. Only the
/// stock check runs here, itemized over every failing line.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReturnCommand {
    pub actor: AuthUser,
    pub seller_id: Uuid,
    pub items: Vec<StockItemInput>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateReturnResult {
    pub return_id: Uuid,
    pub status: ReturnStatus,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for CreateReturnCommand {
    type Result = CreateReturnResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        validate_items(&self.items)?;
        policy::ensure_return_initiator(&self.actor, self.seller_id)?;

        let db = db_pool.as_ref();
        let result = self.create_return_in_db(db).await?;

        info!(
            return_id = %result.return_id,
            seller_id = %self.seller_id,
            total_items = result.total_items,
            "return requested"
        );
        event_sender
            .send_post_commit(Event::ReturnRequested {
                return_id: result.return_id,
                seller_id: self.seller_id,
            })
            .await;

        Ok(result)
    }
}

impl CreateReturnCommand {
    async fn create_return_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<CreateReturnResult, ServiceError> {
        let actor = self.actor.clone();
        let seller_id = self.seller_id;
        let items = self.items.clone();
        let notes = self.notes.clone();

        db.transaction::<_, CreateReturnResult, ServiceError>(move |txn| {
            Box::pin(async move {
                policy::ensure_return_initiator(&actor, seller_id)?;

                let seller = Seller::find_by_id(seller_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Seller {} not found", seller_id))
                    })?;
                // Inactive sellers may still hand stock back, but never
                // across company lines.
                if seller.company_id != actor.company_id {
                    return Err(ServiceError::NotFound(format!(
                        "Seller {} not found",
                        seller_id
                    )));
                }

                let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
                let known = Product::find()
                    .filter(product::Column::CompanyId.eq(seller.company_id))
                    .filter(product::Column::Id.is_in(ids.clone()))
                    .all(txn)
                    .await?;
                if known.len() != ids.len() {
                    let found: std::collections::HashSet<Uuid> =
                        known.iter().map(|p| p.id).collect();
                    let missing = ids.iter().find(|id| !found.contains(id)).copied();
                    return Err(ServiceError::NotFound(format!(
                        "Product {} not found",
                        missing.unwrap_or_default()
                    )));
                }

                // The seller must hold everything they offer to give back.
                let requested: Vec<(Uuid, i32)> =
                    items.iter().map(|i| (i.product_id, i.quantity)).collect();
                let shortages =
                    ledger::shortages_for(txn, StockOwner::Seller(seller_id), &requested).await?;
                if !shortages.is_empty() {
                    return Err(ServiceError::InsufficientStock(shortages));
                }

                let return_id = Uuid::new_v4();
                let now = Utc::now();

                return_request::ActiveModel {
                    id: Set(return_id),
                    company_id: Set(seller.company_id),
                    seller_id: Set(seller_id),
                    created_by: Set(actor.user_id),
                    status: Set(ReturnStatus::AwaitingConfirmation),
                    total_items: Set(items.len() as i32),
                    notes: Set(notes),
                    rejection_reason: Set(None),
                    created_at: Set(now),
                    processed_at: Set(None),
                    processed_by: Set(None),
                }
                .insert(txn)
                .await?;

                for item in &items {
                    return_item::ActiveModel {
                        return_id: Set(return_id),
                        product_id: Set(item.product_id),
                        quantity: Set(item.quantity),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                }

                Ok(CreateReturnResult {
                    return_id,
                    status: ReturnStatus::AwaitingConfirmation,
                    total_items: items.len() as i32,
                    created_at: now,
                })
            })
        })
        .await
        .map_err(crate::commands::transfers::create_transfer_command::unwrap_transaction_error)
    }
}
