use crate::{
    auth::{policy, AuthUser},
    commands::transfers::create_transfer_command::unwrap_transaction_error,
    commands::Command,
    db::DbPool,
    entities::{
        product::{self, Entity as Product},
        stock_movement::MovementReason,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{self, MovementContext, StockOwner},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Issues units into the company's central stock. This is the only way
/// stock enters the system; everything downstream conserves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveStockCommand {
    pub actor: AuthUser,
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiveStockResult {
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub new_balance: i32,
}

#[async_trait::async_trait]
impl Command for ReceiveStockCommand {
    type Result = ReceiveStockResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        policy::ensure_company_manager(&self.actor, self.company_id)?;

        let db = db_pool.as_ref();
        let result = self.receive_in_db(db).await?;

        info!(
            company_id = %result.company_id,
            product_id = %result.product_id,
            quantity = result.quantity,
            "stock receipted"
        );
        event_sender
            .send_post_commit(Event::StockReceived {
                company_id: result.company_id,
                product_id: result.product_id,
                quantity: result.quantity,
            })
            .await;

        Ok(result)
    }
}

impl ReceiveStockCommand {
    async fn receive_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<ReceiveStockResult, ServiceError> {
        let actor = self.actor.clone();
        let company_id = self.company_id;
        let product_id = self.product_id;
        let quantity = self.quantity;

        db.transaction::<_, ReceiveStockResult, ServiceError>(move |txn| {
            Box::pin(async move {
                policy::ensure_company_manager(&actor, company_id)?;

                let product = Product::find_by_id(product_id)
                    .filter(product::Column::CompanyId.eq(company_id))
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", product_id))
                    })?;

                ledger::credit(
                    txn,
                    StockOwner::Company(company_id),
                    product.id,
                    quantity,
                    MovementContext {
                        reason: MovementReason::StockReceipt,
                        related_entity_id: None,
                        actor_id: actor.user_id,
                    },
                )
                .await?;

                let new_balance =
                    ledger::balance_of(txn, StockOwner::Company(company_id), product.id).await?;

                Ok(ReceiveStockResult {
                    company_id,
                    product_id: product.id,
                    quantity,
                    new_balance,
                })
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
