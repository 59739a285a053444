use crate::{
    auth::{policy, AuthUser},
    commands::transfers::create_transfer_command::{load_company_prices, unwrap_transaction_error},
    commands::transfers::{validate_items, StockItemInput},
    commands::Command,
    db::DbPool,
    entities::{
        kit::{self, KitStatus},
        kit_item,
        seller::Entity as Seller,
        stock_movement::MovementReason,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, MovementContext, StockOwner},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Assigns a daily stock kit to a seller.
///
/// Symmetric with transfer creation: company stock is debited up front, so
/// the assigned units are in flight until the seller accepts or rejects.
/// Per-item unit prices are frozen here; later product price edits must not
/// change the commission base of an already-assigned kit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKitCommand {
    pub actor: AuthUser,
    pub company_id: Uuid,
    pub seller_id: Uuid,
    pub kit_date: NaiveDate,
    pub commission_percent: Decimal,
    pub items: Vec<StockItemInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateKitResult {
    pub kit_id: Uuid,
    pub status: KitStatus,
    pub total_items: i32,
    pub assigned_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for CreateKitCommand {
    type Result = CreateKitResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        validate_items(&self.items)?;
        if self.commission_percent < Decimal::ZERO || self.commission_percent > Decimal::from(100) {
            let msg = format!(
                "commission_percent must be between 0 and 100, got {}",
                self.commission_percent
            );
            error!("{}", msg);
            return Err(ServiceError::ValidationError(msg));
        }
        policy::ensure_company_manager(&self.actor, self.company_id)?;

        let db = db_pool.as_ref();
        let result = self.create_kit_in_db(db).await?;

        info!(
            kit_id = %result.kit_id,
            seller_id = %self.seller_id,
            kit_date = %self.kit_date,
            "kit assigned"
        );
        event_sender
            .send_post_commit(Event::KitAssigned {
                kit_id: result.kit_id,
                seller_id: self.seller_id,
            })
            .await;

        Ok(result)
    }
}

impl CreateKitCommand {
    async fn create_kit_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<CreateKitResult, ServiceError> {
        let actor = self.actor.clone();
        let company_id = self.company_id;
        let seller_id = self.seller_id;
        let kit_date = self.kit_date;
        let commission_percent = self.commission_percent;
        let mut items = self.items.clone();
        // Fixed debit order, same as transfer creation.
        items.sort_by_key(|i| i.product_id);

        db.transaction::<_, CreateKitResult, ServiceError>(move |txn| {
            Box::pin(async move {
                policy::ensure_company_manager(&actor, company_id)?;

                let seller = Seller::find_by_id(seller_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Seller {} not found", seller_id))
                    })?;
                policy::ensure_assignable_seller(&actor, &seller)?;

                // Freeze each line's unit price from the product row as it
                // is right now.
                let prices = load_company_prices(txn, company_id, &items).await?;

                let requested: Vec<(Uuid, i32)> =
                    items.iter().map(|i| (i.product_id, i.quantity)).collect();
                let shortages =
                    ledger::shortages_for(txn, StockOwner::Company(company_id), &requested).await?;
                if !shortages.is_empty() {
                    return Err(ServiceError::InsufficientStock(shortages));
                }

                let kit_id = Uuid::new_v4();
                let now = Utc::now();

                kit::ActiveModel {
                    id: Set(kit_id),
                    company_id: Set(company_id),
                    seller_id: Set(seller_id),
                    created_by: Set(actor.user_id),
                    kit_date: Set(kit_date),
                    commission_percent: Set(commission_percent),
                    status: Set(KitStatus::Pending),
                    rejection_reason: Set(None),
                    assigned_at: Set(now),
                    accepted_at: Set(None),
                }
                .insert(txn)
                .await?;

                for item in &items {
                    kit_item::ActiveModel {
                        kit_id: Set(kit_id),
                        product_id: Set(item.product_id),
                        qty_assigned: Set(item.quantity),
                        unit_price: Set(prices[&item.product_id]),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    ledger::debit(
                        txn,
                        StockOwner::Company(company_id),
                        item.product_id,
                        item.quantity,
                        MovementContext {
                            reason: MovementReason::KitOut,
                            related_entity_id: Some(kit_id),
                            actor_id: actor.user_id,
                        },
                    )
                    .await?;
                }

                Ok(CreateKitResult {
                    kit_id,
                    status: KitStatus::Pending,
                    total_items: items.len() as i32,
                    assigned_at: now,
                })
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
