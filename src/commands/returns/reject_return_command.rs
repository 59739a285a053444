use crate::{
    auth::{policy, AuthUser},
    commands::transfers::create_transfer_command::unwrap_transaction_error,
    commands::Command,
    db::DbPool,
    entities::return_request::{self, Entity as ReturnRequest, ReturnStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Company refusal of a devolution. Status only: the stock never moved, so
/// it simply stays with the seller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectReturnCommand {
    pub actor: AuthUser,
    pub return_id: Uuid,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectReturnResult {
    pub return_id: Uuid,
    pub status: ReturnStatus,
}

#[async_trait::async_trait]
impl Command for RejectReturnCommand {
    type Result = RejectReturnResult;

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

        info!(return_id = %result.return_id, "return rejected");
        event_sender
            .send_post_commit(Event::ReturnRejected {
                return_id: result.return_id,
                seller_id,
            })
            .await;

        Ok(result)
    }
}

impl RejectReturnCommand {
    async fn reject_in_db(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(RejectReturnResult, Uuid), ServiceError> {
        let actor = self.actor.clone();
        let return_id = self.return_id;
        let reason = self.reason.clone();

        db.transaction::<_, (RejectReturnResult, Uuid), ServiceError>(move |txn| {
            Box::pin(async move {
                let ret = ReturnRequest::find_by_id(return_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Return {} not found", return_id))
                    })?;
                policy::ensure_return_processor(&actor, &ret)?;

                let flipped = ReturnRequest::update_many()
                    .col_expr(
                        return_request::Column::Status,
                        Expr::value(ReturnStatus::Rejected),
                    )
                    .col_expr(return_request::Column::RejectionReason, Expr::value(reason))
                    .col_expr(
                        return_request::Column::ProcessedAt,
                        Expr::value(Utc::now()),
                    )
                    .col_expr(
                        return_request::Column::ProcessedBy,
                        Expr::value(actor.user_id),
                    )
                    .filter(return_request::Column::Id.eq(return_id))
                    .filter(return_request::Column::Status.eq(ReturnStatus::AwaitingConfirmation))
                    .exec(txn)
                    .await?;
                if flipped.rows_affected == 0 {
                    return Err(ServiceError::InvalidStateTransition {
                        entity: "return",
                        id: return_id,
                        current: ret.status.as_str().to_string(),
                    });
                }

                Ok((
                    RejectReturnResult {
                        return_id,
                        status: ReturnStatus::Rejected,
                    },
                    ret.seller_id,
                ))
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}
