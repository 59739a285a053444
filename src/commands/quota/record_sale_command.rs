use crate::{
    auth::{policy, AuthUser},
    commands::quota::{year_month, SOLO_FREE_MONTHLY_LIMIT},
    commands::transfers::create_transfer_command::unwrap_transaction_error,
    commands::Command,
    db::DbPool,
    entities::{
        account::{Entity as Account, PlanTier},
        quota_record::{self, Entity as QuotaRecord},
        quota_sale,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::is_unique_violation,
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

lazy_static! {
    static ref SALES_RECORDED: IntCounter = IntCounter::new(
        "quota_sales_recorded_total",
        "Total number of confirmed sales counted against quotas"
    )
    .expect("metric can be created");
}

/// Counts one confirmed sale against the account's monthly quota.
///
/// Idempotent per sale id: a retry of an already-counted sale fails with a
/// conflict and never double-counts. Called once per sale transaction, not
/// per line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSaleCommand {
    pub actor: AuthUser,
    pub account_id: Uuid,
    pub sale_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordSaleResult {
    pub account_id: Uuid,
    pub sale_id: Uuid,
    pub year_month: String,
    pub sales_count: i32,
}

#[async_trait::async_trait]
impl Command for RecordSaleCommand {
    type Result = RecordSaleResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        policy::ensure_account_member(&self.actor, self.account_id)?;

        let db = db_pool.as_ref();
        let result = self.record_in_db(db).await?;

        SALES_RECORDED.inc();
        info!(
            account_id = %result.account_id,
            sale_id = %result.sale_id,
            sales_count = result.sales_count,
            "sale counted against quota"
        );
        event_sender
            .send_post_commit(Event::SaleRecorded {
                account_id: result.account_id,
                sale_id: result.sale_id,
                sales_count: result.sales_count,
            })
            .await;

        Ok(result)
    }
}

impl RecordSaleCommand {
    async fn record_in_db(&self, db: &DatabaseConnection) -> Result<RecordSaleResult, ServiceError> {
        let account_id = self.account_id;
        let sale_id = self.sale_id;

        db.transaction::<_, RecordSaleResult, ServiceError>(move |txn| {
            Box::pin(async move {
                let account = Account::find_by_id(account_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Account {} not found", account_id))
                    })?;

                let month = year_month(Utc::now());

                // The idempotency row goes in first; a duplicate sale id
                // aborts before anything is counted.
                let sale_row = quota_sale::ActiveModel {
                    sale_id: Set(sale_id),
                    account_id: Set(account_id),
                    year_month: Set(month.clone()),
                    recorded_at: Set(Utc::now()),
                };
                match sale_row.insert(txn).await {
                    Ok(_) => {}
                    Err(err) if is_unique_violation(&err) => {
                        return Err(ServiceError::DuplicateSale(sale_id));
                    }
                    Err(err) => return Err(ServiceError::DatabaseError(err)),
                }

                let record = ensure_month_record(txn, &account, &month).await?;

                // Enforcement reads the account's current plan, never the
                // snapshot on the record.
                let limited = account.plan.is_limited();
                if limited && record.sales_count >= SOLO_FREE_MONTHLY_LIMIT {
                    return Err(ServiceError::QuotaExceeded {
                        account_id,
                        limit: SOLO_FREE_MONTHLY_LIMIT,
                    });
                }

                // Guarded increment: concurrent sales racing to the ceiling
                // resolve to at most `limit` counted this month.
                let mut update = QuotaRecord::update_many()
                    .col_expr(
                        quota_record::Column::SalesCount,
                        Expr::col(quota_record::Column::SalesCount).add(1),
                    )
                    .col_expr(quota_record::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(quota_record::Column::Id.eq(record.id));
                if limited {
                    update = update
                        .filter(quota_record::Column::SalesCount.lt(SOLO_FREE_MONTHLY_LIMIT));
                }
                let incremented = update.exec(txn).await?;
                if incremented.rows_affected == 0 {
                    return Err(ServiceError::QuotaExceeded {
                        account_id,
                        limit: SOLO_FREE_MONTHLY_LIMIT,
                    });
                }

                Ok(RecordSaleResult {
                    account_id,
                    sale_id,
                    year_month: month,
                    sales_count: record.sales_count + 1,
                })
            })
        })
        .await
        .map_err(unwrap_transaction_error)
    }
}

/// Loads the month's quota record, creating it lazily on first use. The
/// plan/limit stored on the row are an audit snapshot of creation time.
pub(crate) async fn ensure_month_record<C: sea_orm::ConnectionTrait>(
    conn: &C,
    account: &crate::entities::account::Model,
    month: &str,
) -> Result<quota_record::Model, ServiceError> {
    let existing = QuotaRecord::find()
        .filter(
            Condition::all()
                .add(quota_record::Column::AccountId.eq(account.id))
                .add(quota_record::Column::YearMonth.eq(month)),
        )
        .one(conn)
        .await?;
    if let Some(record) = existing {
        return Ok(record);
    }

    let now = Utc::now();
    let fresh = quota_record::ActiveModel {
        account_id: Set(account.id),
        year_month: Set(month.to_string()),
        sales_count: Set(0),
        monthly_limit: Set(monthly_limit_for(account.plan)),
        plan: Set(account.plan),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    match fresh.insert(conn).await {
        Ok(record) => Ok(record),
        // Lost the lazy-create race; the winner's row is the record.
        Err(err) if is_unique_violation(&err) => QuotaRecord::find()
            .filter(
                Condition::all()
                    .add(quota_record::Column::AccountId.eq(account.id))
                    .add(quota_record::Column::YearMonth.eq(month)),
            )
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "quota record for account {} month {} vanished",
                    account.id, month
                ))
            }),
        Err(err) => Err(ServiceError::DatabaseError(err)),
    }
}

/// Snapshot limit stored on a fresh month record; zero means unlimited.
pub(crate) fn monthly_limit_for(plan: PlanTier) -> i32 {
    if plan.is_limited() {
        SOLO_FREE_MONTHLY_LIMIT
    } else {
        0
    }
}
