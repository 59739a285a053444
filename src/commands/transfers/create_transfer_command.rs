use crate::{
    auth::{policy, AuthUser},
    commands::transfers::{validate_items, StockItemInput},
    commands::Command,
    db::DbPool,
    entities::{
        product::{self, Entity as Product},
        seller::Entity as Seller,
        transfer::{self, TransferStatus},
        transfer_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, MovementContext, StockOwner},
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref TRANSFERS_CREATED: IntCounter = IntCounter::new(
        "transfers_created_total",
        "Total number of stock transfers created"
    )
    .expect("metric can be created");
    static ref TRANSFER_CREATE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "transfer_create_failures_total",
            "Total number of failed transfer creations"
        ),
        &["error_type"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransferCommand {
    pub actor: AuthUser,
    pub company_id: Uuid,
    pub seller_id: Uuid,
    pub items: Vec<StockItemInput>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTransferResult {
    pub transfer_id: Uuid,
    pub status: TransferStatus,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
impl Command for CreateTransferCommand {
    type Result = CreateTransferResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            TRANSFER_CREATE_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        validate_items(&self.items)?;
        policy::ensure_company_manager(&self.actor, self.company_id)?;

        let db = db_pool.as_ref();
        let result = self.create_transfer_in_db(db).await.map_err(|e| {
            TRANSFER_CREATE_FAILURES
                .with_label_values(&[failure_label(&e)])
                .inc();
            e
        })?;

        TRANSFERS_CREATED.inc();
        info!(
            transfer_id = %result.transfer_id,
            seller_id = %self.seller_id,
            total_items = result.total_items,
            "transfer created"
        );
        event_sender
            .send_post_commit(Event::TransferCreated {
                transfer_id: result.transfer_id,
                seller_id: self.seller_id,
                total_items: result.total_items,
            })
            .await;

        Ok(result)
    }
}

impl CreateTransferCommand {
    async fn create_transfer_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<CreateTransferResult, ServiceError> {
        let actor = self.actor.clone();
        let company_id = self.company_id;
        let seller_id = self.seller_id;
        let mut items = self.items.clone();
        // Debit rows in a fixed order so concurrent transfers touching the
        // same products cannot deadlock.
        items.sort_by_key(|i| i.product_id);
        let notes = self.notes.clone();

        db.transaction::<_, CreateTransferResult, ServiceError>(move |txn| {
            Box::pin(async move {
                // Re-validate ownership inside the transaction.
                policy::ensure_company_manager(&actor, company_id)?;

                let seller = Seller::find_by_id(seller_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Seller {} not found", seller_id))
                    })?;
                policy::ensure_assignable_seller(&actor, &seller)?;

                let prices = load_company_prices(txn, company_id, &items).await?;

                // Stock check over every line before any write, so the
                // failure enumerates all shortages at once.
                let requested: Vec<(Uuid, i32)> =
                    items.iter().map(|i| (i.product_id, i.quantity)).collect();
                let shortages =
                    ledger::shortages_for(txn, StockOwner::Company(company_id), &requested).await?;
                if !shortages.is_empty() {
                    return Err(ServiceError::InsufficientStock(shortages));
                }

                let transfer_id = Uuid::new_v4();
                let now = Utc::now();
                let total_items = items.len() as i32;

                transfer::ActiveModel {
                    id: Set(transfer_id),
                    company_id: Set(company_id),
                    seller_id: Set(seller_id),
                    created_by: Set(actor.user_id),
                    status: Set(TransferStatus::Created),
                    total_items: Set(total_items),
                    notes: Set(notes),
                    rejection_reason: Set(None),
                    created_at: Set(now),
                    processed_at: Set(None),
                }
                .insert(txn)
                .await?;

                for item in &items {
                    transfer_item::ActiveModel {
                        transfer_id: Set(transfer_id),
                        product_id: Set(item.product_id),
                        quantity: Set(item.quantity),
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
                            reason: crate::entities::stock_movement::MovementReason::TransferOut,
                            related_entity_id: Some(transfer_id),
                            actor_id: actor.user_id,
                        },
                    )
                    .await?;
                }

                Ok(CreateTransferResult {
                    transfer_id,
                    status: TransferStatus::Created,
                    total_items,
                    created_at: now,
                })
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}

/// Loads unit prices for every requested product, verifying each belongs to
/// the company and is active.
pub(crate) async fn load_company_prices<C: sea_orm::ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    items: &[StockItemInput],
) -> Result<HashMap<Uuid, rust_decimal::Decimal>, ServiceError> {
    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products = Product::find()
        .filter(product::Column::CompanyId.eq(company_id))
        .filter(product::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await?;

    let found: HashMap<Uuid, rust_decimal::Decimal> =
        products.iter().map(|p| (p.id, p.unit_price)).collect();

    for id in &ids {
        if !found.contains_key(id) {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
    }
    for p in &products {
        if !p.active {
            return Err(ServiceError::ValidationError(format!(
                "Product {} is inactive",
                p.id
            )));
        }
    }
    Ok(found)
}

pub(crate) fn unwrap_transaction_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

fn failure_label(e: &ServiceError) -> &'static str {
    match e {
        ServiceError::InsufficientStock(_) => "insufficient_stock",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::Forbidden(_) => "forbidden",
        ServiceError::ValidationError(_) => "validation_error",
        _ => "other",
    }
}
