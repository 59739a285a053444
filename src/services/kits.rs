use crate::{
    commands::kits::{
        accept_kit_command::{AcceptKitCommand, AcceptKitResult},
        create_kit_command::{CreateKitCommand, CreateKitResult},
        reject_kit_command::{RejectKitCommand, RejectKitResult},
    },
    commands::Command,
    db::DbPool,
    entities::kit::{self, Entity as Kit, KitStatus},
    entities::kit_item::{self, Entity as KitItem},
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service for the daily kit assignment workflow
#[derive(Clone)]
pub struct KitService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Copy)]
pub enum KitScope {
    Company(Uuid),
    Seller(Uuid),
}

impl KitService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command))]
    pub async fn create_kit(&self, command: CreateKitCommand) -> Result<CreateKitResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn accept_kit(&self, command: AcceptKitCommand) -> Result<AcceptKitResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn reject_kit(&self, command: RejectKitCommand) -> Result<RejectKitResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a kit and its line items.
    #[instrument(skip(self))]
    pub async fn get_kit(
        &self,
        kit_id: Uuid,
    ) -> Result<Option<(kit::Model, Vec<kit_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;
        let Some(header) = Kit::find_by_id(kit_id).one(db).await? else {
            return Ok(None);
        };
        let items = KitItem::find()
            .filter(kit_item::Column::KitId.eq(kit_id))
            .all(db)
            .await?;
        Ok(Some((header, items)))
    }

    /// Lists kits newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_kits(
        &self,
        scope: KitScope,
        status: Option<KitStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<kit::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Kit::find();
        query = match scope {
            KitScope::Company(company_id) => query.filter(kit::Column::CompanyId.eq(company_id)),
            KitScope::Seller(seller_id) => query.filter(kit::Column::SellerId.eq(seller_id)),
        };
        if let Some(status) = status {
            query = query.filter(kit::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(kit::Column::AssignedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((records, total))
    }
}
