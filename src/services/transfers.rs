use crate::{
    commands::transfers::{
        accept_transfer_command::{AcceptTransferCommand, AcceptTransferResult},
        cancel_transfer_command::{CancelTransferCommand, CancelTransferResult},
        create_transfer_command::{CreateTransferCommand, CreateTransferResult},
        reject_transfer_command::{RejectTransferCommand, RejectTransferResult},
    },
    commands::Command,
    db::DbPool,
    entities::transfer::{self, Entity as Transfer, TransferStatus},
    entities::transfer_item::{self, Entity as TransferItem},
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service for the company-to-seller transfer workflow
#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

/// Scope for listing transfers: everything in the company, or one seller's.
#[derive(Debug, Clone, Copy)]
pub enum TransferScope {
    Company(Uuid),
    Seller(Uuid),
}

impl TransferService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command))]
    pub async fn create_transfer(
        &self,
        command: CreateTransferCommand,
    ) -> Result<CreateTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn accept_transfer(
        &self,
        command: AcceptTransferCommand,
    ) -> Result<AcceptTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn reject_transfer(
        &self,
        command: RejectTransferCommand,
    ) -> Result<RejectTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn cancel_transfer(
        &self,
        command: CancelTransferCommand,
    ) -> Result<CancelTransferResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a transfer and its line items.
    #[instrument(skip(self))]
    pub async fn get_transfer(
        &self,
        transfer_id: Uuid,
    ) -> Result<Option<(transfer::Model, Vec<transfer_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;
        let Some(header) = Transfer::find_by_id(transfer_id).one(db).await? else {
            return Ok(None);
        };
        let items = TransferItem::find()
            .filter(transfer_item::Column::TransferId.eq(transfer_id))
            .all(db)
            .await?;
        Ok(Some((header, items)))
    }

    /// Lists transfers newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_transfers(
        &self,
        scope: TransferScope,
        status: Option<TransferStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<transfer::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Transfer::find();
        query = match scope {
            TransferScope::Company(company_id) => {
                query.filter(transfer::Column::CompanyId.eq(company_id))
            }
            TransferScope::Seller(seller_id) => {
                query.filter(transfer::Column::SellerId.eq(seller_id))
            }
        };
        if let Some(status) = status {
            query = query.filter(transfer::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(transfer::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((records, total))
    }
}
