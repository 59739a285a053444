//! Integration tests for the solo quota tracker: the monthly ceiling,
//! sale-id idempotency, and plan upgrades mid-month.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use fieldstock_api::commands::quota::record_sale_command::RecordSaleCommand;
use fieldstock_api::commands::quota::SOLO_FREE_MONTHLY_LIMIT;
use fieldstock_api::entities::account::{self, PlanTier};
use fieldstock_api::errors::ServiceError;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

async fn record_one(app: &TestApp, sale_id: Uuid) -> Result<i32, ServiceError> {
    app.services
        .quota
        .record_sale(RecordSaleCommand {
            actor: app.owner.clone(),
            account_id: app.account_id,
            sale_id,
        })
        .await
        .map(|r| r.sales_count)
}

async fn upgrade_plan(app: &TestApp, plan: PlanTier) {
    let current = account::Entity::find_by_id(app.account_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let mut update: account::ActiveModel = current.into();
    update.plan = Set(plan);
    update.update(&*app.db).await.unwrap();
}

#[tokio::test]
async fn quota_record_is_created_lazily_and_counts_up() {
    let app = TestApp::new().await;

    let status = app.services.quota.check_quota(app.account_id).await.unwrap();
    assert!(status.allowed);
    assert_eq!(status.sales_count, 0);
    assert_eq!(status.limit, Some(SOLO_FREE_MONTHLY_LIMIT));

    assert_eq!(record_one(&app, Uuid::new_v4()).await.unwrap(), 1);
    assert_eq!(record_one(&app, Uuid::new_v4()).await.unwrap(), 2);

    let status = app.services.quota.check_quota(app.account_id).await.unwrap();
    assert_eq!(status.sales_count, 2);
    assert!(status.allowed);
}

#[tokio::test]
async fn duplicate_sale_id_is_counted_once() {
    let app = TestApp::new().await;
    let sale_id = Uuid::new_v4();

    assert_eq!(record_one(&app, sale_id).await.unwrap(), 1);
    assert_matches!(
        record_one(&app, sale_id).await,
        Err(ServiceError::DuplicateSale(id)) if id == sale_id
    );

    let status = app.services.quota.check_quota(app.account_id).await.unwrap();
    assert_eq!(status.sales_count, 1);
}

#[tokio::test]
async fn free_solo_accounts_stop_at_the_monthly_limit() {
    let app = TestApp::new().await;

    for _ in 0..SOLO_FREE_MONTHLY_LIMIT {
        record_one(&app, Uuid::new_v4()).await.unwrap();
    }

    let status = app.services.quota.check_quota(app.account_id).await.unwrap();
    assert!(!status.allowed);
    assert_eq!(status.sales_count, SOLO_FREE_MONTHLY_LIMIT);
    assert!(status.reason.is_some());

    assert_matches!(
        record_one(&app, Uuid::new_v4()).await,
        Err(ServiceError::QuotaExceeded { limit, .. }) if limit == SOLO_FREE_MONTHLY_LIMIT
    );
}

#[tokio::test]
async fn plan_upgrade_unblocks_without_resetting_the_count() {
    let app = TestApp::new().await;

    for _ in 0..SOLO_FREE_MONTHLY_LIMIT {
        record_one(&app, Uuid::new_v4()).await.unwrap();
    }
    let status = app.services.quota.check_quota(app.account_id).await.unwrap();
    assert!(!status.allowed);

    upgrade_plan(&app, PlanTier::SoloPro).await;

    let status = app.services.quota.check_quota(app.account_id).await.unwrap();
    assert!(status.allowed, "paid tiers are unlimited");
    assert_eq!(
        status.sales_count, SOLO_FREE_MONTHLY_LIMIT,
        "the count survives the upgrade"
    );
    assert_eq!(status.limit, None);

    // And sales can actually proceed past the old ceiling.
    assert_eq!(
        record_one(&app, Uuid::new_v4()).await.unwrap(),
        SOLO_FREE_MONTHLY_LIMIT + 1
    );
}

#[tokio::test]
async fn unknown_account_is_not_found() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    let result = app.services.quota.check_quota(missing).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn foreign_account_is_forbidden() {
    let app = TestApp::new().await;

    let result = app
        .services
        .quota
        .record_sale(RecordSaleCommand {
            actor: app.owner.clone(),
            account_id: Uuid::new_v4(),
            sale_id: Uuid::new_v4(),
        })
        .await;

    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}
