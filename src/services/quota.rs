use crate::{
    commands::quota::{
        record_sale_command::{ensure_month_record, RecordSaleCommand, RecordSaleResult},
        year_month, SOLO_FREE_MONTHLY_LIMIT,
    },
    commands::Command,
    db::DbPool,
    entities::account::Entity as Account,
    errors::ServiceError,
    events::EventSender,
};
use chrono::Utc;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of a quota check for the current calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotaStatus {
    pub account_id: Uuid,
    pub year_month: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub sales_count: i32,
    /// Ceiling for the account's current plan; absent means unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

/// Service for the solo-account monthly sales quota
#[derive(Clone)]
pub struct QuotaService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl QuotaService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Whether the account may confirm another sale this month.
    ///
    /// Creates the month's record lazily. `allowed` is computed from the
    /// account's CURRENT plan: upgrading mid-month unblocks sales without
    /// resetting the count.
    #[instrument(skip(self))]
    pub async fn check_quota(&self, account_id: Uuid) -> Result<QuotaStatus, ServiceError> {
        let db = &*self.db_pool;

        let account = Account::find_by_id(account_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", account_id)))?;

        let month = year_month(Utc::now());
        let record = ensure_month_record(db, &account, &month).await?;

        let limited = account.plan.is_limited();
        let allowed = !limited || record.sales_count < SOLO_FREE_MONTHLY_LIMIT;

        Ok(QuotaStatus {
            account_id,
            year_month: month,
            allowed,
            reason: (!allowed).then(|| {
                format!(
                    "free solo plan is capped at {} sales per month",
                    SOLO_FREE_MONTHLY_LIMIT
                )
            }),
            sales_count: record.sales_count,
            limit: limited.then_some(SOLO_FREE_MONTHLY_LIMIT),
        })
    }

    /// Counts one confirmed sale; idempotent per sale id.
    #[instrument(skip(self, command))]
    pub async fn record_sale(
        &self,
        command: RecordSaleCommand,
    ) -> Result<RecordSaleResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}
