//! Integration tests for the kit assignment workflow: symmetric ledger
//! movements, price freezing, and the acceptance timestamp.

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::TestApp;
use fieldstock_api::commands::kits::accept_kit_command::AcceptKitCommand;
use fieldstock_api::commands::kits::create_kit_command::CreateKitCommand;
use fieldstock_api::commands::kits::reject_kit_command::RejectKitCommand;
use fieldstock_api::commands::transfers::StockItemInput;
use fieldstock_api::entities::kit::KitStatus;
use fieldstock_api::entities::{kit, kit_item, product};
use fieldstock_api::errors::ServiceError;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

fn kit_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

fn one_line(product_id: Uuid, quantity: i32) -> Vec<StockItemInput> {
    vec![StockItemInput {
        product_id,
        quantity,
    }]
}

#[tokio::test]
async fn kit_creation_debits_company_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("KIT-1", dec!(15.00)).await;
    app.receive_stock(product, 40).await;

    let created = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(12.5),
            items: one_line(product, 25),
        })
        .await
        .expect("kit should be created");

    assert_eq!(created.status, KitStatus::Pending);
    // The assignment itself takes the units out of central stock.
    assert_eq!(app.company_stock(product).await, 15);
    assert_eq!(app.seller_stock(app.seller_id, product).await, 0);
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn accept_kit_credits_seller_and_stamps_accepted_at() {
    let app = TestApp::new().await;
    let product = app.seed_product("KIT-2", dec!(20.00)).await;
    app.receive_stock(product, 10).await;

    let created = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(10),
            items: one_line(product, 10),
        })
        .await
        .unwrap();

    // Not accepted yet: no timestamp.
    let pending = kit::Entity::find_by_id(created.kit_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(pending.accepted_at.is_none());

    let accepted = app
        .services
        .kits
        .accept_kit(AcceptKitCommand {
            actor: app.seller.clone(),
            kit_id: created.kit_id,
        })
        .await
        .unwrap();

    assert_eq!(accepted.status, KitStatus::Accepted);
    assert_eq!(app.seller_stock(app.seller_id, product).await, 10);
    assert_eq!(app.company_stock(product).await, 0);

    let stored = kit::Entity::find_by_id(created.kit_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let stamped = stored.accepted_at.expect("accepted_at set on acceptance");
    assert!(stamped >= created.assigned_at);
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn reject_kit_reverses_the_assignment_debit() {
    let app = TestApp::new().await;
    let product = app.seed_product("KIT-3", dec!(8.00)).await;
    app.receive_stock(product, 12).await;

    let created = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(5),
            items: one_line(product, 12),
        })
        .await
        .unwrap();
    assert_eq!(app.company_stock(product).await, 0);

    let rejected = app
        .services
        .kits
        .reject_kit(RejectKitCommand {
            actor: app.seller.clone(),
            kit_id: created.kit_id,
            reason: Some("did not work today".into()),
        })
        .await
        .unwrap();

    assert_eq!(rejected.status, KitStatus::Rejected);
    assert_eq!(app.company_stock(product).await, 12);
    assert_eq!(app.seller_stock(app.seller_id, product).await, 0);

    let stored = kit::Entity::find_by_id(created.kit_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.accepted_at.is_none());
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn kit_prices_are_frozen_against_later_product_edits() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("KIT-4", dec!(30.00)).await;
    app.receive_stock(product_id, 6).await;

    let created = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(10),
            items: one_line(product_id, 6),
        })
        .await
        .unwrap();

    // Reprice the product after assignment.
    let current = product::Entity::find_by_id(product_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    let mut update: product::ActiveModel = current.into();
    update.unit_price = Set(dec!(99.00));
    update.update(&*app.db).await.unwrap();

    let line = kit_item::Entity::find()
        .filter(kit_item::Column::KitId.eq(created.kit_id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line.unit_price, dec!(30.00));
}

#[tokio::test]
async fn second_kit_decision_is_conflict() {
    let app = TestApp::new().await;
    let product = app.seed_product("KIT-5", dec!(4.00)).await;
    app.receive_stock(product, 4).await;

    let created = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(0),
            items: one_line(product, 4),
        })
        .await
        .unwrap();

    app.services
        .kits
        .accept_kit(AcceptKitCommand {
            actor: app.seller.clone(),
            kit_id: created.kit_id,
        })
        .await
        .unwrap();

    let reject_after_accept = app
        .services
        .kits
        .reject_kit(RejectKitCommand {
            actor: app.seller.clone(),
            kit_id: created.kit_id,
            reason: None,
        })
        .await;

    assert_matches!(
        reject_after_accept,
        Err(ServiceError::InvalidStateTransition { entity: "kit", .. })
    );
    assert_eq!(app.seller_stock(app.seller_id, product).await, 4);
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn commission_outside_range_is_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("KIT-6", dec!(2.00)).await;
    app.receive_stock(product, 2).await;

    let result = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(120),
            items: one_line(product, 1),
        })
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert_eq!(app.company_stock(product).await, 2);
}

#[tokio::test]
async fn kit_shortage_is_itemized() {
    let app = TestApp::new().await;
    let product = app.seed_product("KIT-7", dec!(2.00)).await;
    app.receive_stock(product, 3).await;

    let result = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: kit_date(),
            commission_percent: dec!(10),
            items: one_line(product, 5),
        })
        .await;

    match result {
        Err(ServiceError::InsufficientStock(shortages)) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].requested, 5);
            assert_eq!(shortages[0].available, 3);
        }
        other => panic!("expected shortage, got {:?}", other.map(|r| r.kit_id)),
    }
    assert_eq!(app.company_stock(product).await, 3);
}
