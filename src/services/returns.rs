use crate::{
    commands::returns::{
        accept_return_command::{AcceptReturnCommand, AcceptReturnResult},
        create_return_command::{CreateReturnCommand, CreateReturnResult},
        reject_return_command::{RejectReturnCommand, RejectReturnResult},
    },
    commands::Command,
    db::DbPool,
    entities::return_item::{self, Entity as ReturnItem},
    entities::return_request::{self, Entity as ReturnRequest, ReturnStatus},
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service for the devolution (seller-to-company return) workflow
#[derive(Clone)]
pub struct ReturnService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Copy)]
pub enum ReturnScope {
    Company(Uuid),
    Seller(Uuid),
}

impl ReturnService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command))]
    pub async fn create_return(
        &self,
        command: CreateReturnCommand,
    ) -> Result<CreateReturnResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn accept_return(
        &self,
        command: AcceptReturnCommand,
    ) -> Result<AcceptReturnResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command))]
    pub async fn reject_return(
        &self,
        command: RejectReturnCommand,
    ) -> Result<RejectReturnResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a return and its line items.
    #[instrument(skip(self))]
    pub async fn get_return(
        &self,
        return_id: Uuid,
    ) -> Result<Option<(return_request::Model, Vec<return_item::Model>)>, ServiceError> {
        let db = &*self.db_pool;
        let Some(header) = ReturnRequest::find_by_id(return_id).one(db).await? else {
            return Ok(None);
        };
        let items = ReturnItem::find()
            .filter(return_item::Column::ReturnId.eq(return_id))
            .all(db)
            .await?;
        Ok(Some((header, items)))
    }

    /// Lists returns newest first, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        scope: ReturnScope,
        status: Option<ReturnStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<return_request::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = ReturnRequest::find();
        query = match scope {
            ReturnScope::Company(company_id) => {
                query.filter(return_request::Column::CompanyId.eq(company_id))
            }
            ReturnScope::Seller(seller_id) => {
                query.filter(return_request::Column::SellerId.eq(seller_id))
            }
        };
        if let Some(status) = status {
            query = query.filter(return_request::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(return_request::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let records = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((records, total))
    }
}
