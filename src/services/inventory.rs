use crate::{
    commands::inventory::receive_stock_command::{ReceiveStockCommand, ReceiveStockResult},
    commands::Command,
    db::DbPool,
    entities::inventory_balance::{self, Entity as InventoryBalance},
    entities::stock_movement::{self, Entity as StockMovement},
    errors::ServiceError,
    events::EventSender,
    ledger::{self, StockOwner},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read surface over the ledger plus the stock receipt entry point.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command))]
    pub async fn receive_stock(
        &self,
        command: ReceiveStockCommand,
    ) -> Result<ReceiveStockResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Current balance for one (owner, product) pair.
    #[instrument(skip(self))]
    pub async fn balance_of(
        &self,
        owner: StockOwner,
        product_id: Uuid,
    ) -> Result<i32, ServiceError> {
        ledger::balance_of(&*self.db_pool, owner, product_id).await
    }

    /// All balance rows held by an owner.
    #[instrument(skip(self))]
    pub async fn balances_for(
        &self,
        owner: StockOwner,
    ) -> Result<Vec<inventory_balance::Model>, ServiceError> {
        let db = &*self.db_pool;
        let rows = InventoryBalance::find()
            .filter(inventory_balance::Column::OwnerType.eq(owner.owner_type()))
            .filter(inventory_balance::Column::OwnerId.eq(owner.owner_id()))
            .order_by_asc(inventory_balance::Column::ProductId)
            .all(db)
            .await?;
        Ok(rows)
    }

    /// Movement log for an owner, newest first.
    #[instrument(skip(self))]
    pub async fn movements_for(
        &self,
        owner: StockOwner,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = StockMovement::find()
            .filter(stock_movement::Column::OwnerType.eq(owner.owner_type()))
            .filter(stock_movement::Column::OwnerId.eq(owner.owner_id()))
            .order_by_desc(stock_movement::Column::Id)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((records, total))
    }
}
