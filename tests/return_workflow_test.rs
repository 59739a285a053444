//! Integration tests for the devolution workflow. The load-bearing property
//! is the asymmetry with transfers: raising a return moves nothing; only
//! company acceptance moves stock, on both sides at once.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use fieldstock_api::commands::returns::accept_return_command::AcceptReturnCommand;
use fieldstock_api::commands::returns::create_return_command::CreateReturnCommand;
use fieldstock_api::commands::returns::reject_return_command::RejectReturnCommand;
use fieldstock_api::commands::transfers::accept_transfer_command::AcceptTransferCommand;
use fieldstock_api::commands::transfers::create_transfer_command::CreateTransferCommand;
use fieldstock_api::commands::transfers::StockItemInput;
use fieldstock_api::entities::return_request::ReturnStatus;
use fieldstock_api::errors::ServiceError;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn one_line(product_id: Uuid, quantity: i32) -> Vec<StockItemInput> {
    vec![StockItemInput {
        product_id,
        quantity,
    }]
}

/// Puts `qty` units in the seller's hands via a full transfer round-trip.
async fn stock_seller(app: &TestApp, product: Uuid, qty: i32) {
    app.receive_stock(product, qty).await;
    let created = app
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            items: one_line(product, qty),
            notes: None,
        })
        .await
        .unwrap();
    app.services
        .transfers
        .accept_transfer(AcceptTransferCommand {
            actor: app.seller.clone(),
            transfer_id: created.transfer_id,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn creating_a_return_moves_no_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("RET-1", dec!(10.00)).await;
    stock_seller(&app, product, 20).await;

    let created = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 15),
            notes: Some("end of season".into()),
        })
        .await
        .expect("return should be created");

    assert_eq!(created.status, ReturnStatus::AwaitingConfirmation);
    // The asymmetry: balances are untouched until the company accepts.
    assert_eq!(app.seller_stock(app.seller_id, product).await, 20);
    assert_eq!(app.company_stock(product).await, 0);
    assert!(app.movements_related_to(created.return_id).await.is_empty());
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn accepting_a_return_moves_both_sides_atomically() {
    let app = TestApp::new().await;
    let product = app.seed_product("RET-2", dec!(6.00)).await;
    stock_seller(&app, product, 10).await;

    let created = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 10),
            notes: None,
        })
        .await
        .unwrap();

    let accepted = app
        .services
        .returns
        .accept_return(AcceptReturnCommand {
            actor: app.owner.clone(),
            return_id: created.return_id,
        })
        .await
        .unwrap();

    assert_eq!(accepted.status, ReturnStatus::Accepted);
    assert_eq!(app.seller_stock(app.seller_id, product).await, 0);
    assert_eq!(app.company_stock(product).await, 10);

    // One seller debit and one company credit per line.
    let movements = app.movements_related_to(created.return_id).await;
    assert_eq!(movements.len(), 2);
    assert!(movements.iter().any(|m| m.delta == -10));
    assert!(movements.iter().any(|m| m.delta == 10));
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn rejecting_a_return_leaves_stock_with_the_seller() {
    let app = TestApp::new().await;
    let product = app.seed_product("RET-3", dec!(4.00)).await;
    stock_seller(&app, product, 7).await;

    let created = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 7),
            notes: None,
        })
        .await
        .unwrap();

    let rejected = app
        .services
        .returns
        .reject_return(RejectReturnCommand {
            actor: app.owner.clone(),
            return_id: created.return_id,
            reason: Some("units already counted".into()),
        })
        .await
        .unwrap();

    assert_eq!(rejected.status, ReturnStatus::Rejected);
    assert_eq!(app.seller_stock(app.seller_id, product).await, 7);
    assert_eq!(app.company_stock(product).await, 0);
    assert!(app.movements_related_to(created.return_id).await.is_empty());
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn return_exceeding_seller_stock_is_itemized() {
    let app = TestApp::new().await;
    let product = app.seed_product("RET-4", dec!(3.00)).await;
    stock_seller(&app, product, 5).await;

    let result = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 9),
            notes: None,
        })
        .await;

    match result {
        Err(ServiceError::InsufficientStock(shortages)) => {
            assert_eq!(shortages.len(), 1);
            assert_eq!(shortages[0].product_id, product);
            assert_eq!(shortages[0].requested, 9);
            assert_eq!(shortages[0].available, 5);
        }
        other => panic!("expected shortage, got {:?}", other.map(|r| r.return_id)),
    }
}

#[tokio::test]
async fn acceptance_fails_when_seller_no_longer_holds_the_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("RET-5", dec!(2.00)).await;
    stock_seller(&app, product, 10).await;

    // Two overlapping returns for the same units.
    let first = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 8),
            notes: None,
        })
        .await
        .unwrap();
    let second = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 8),
            notes: None,
        })
        .await
        .unwrap();

    app.services
        .returns
        .accept_return(AcceptReturnCommand {
            actor: app.owner.clone(),
            return_id: first.return_id,
        })
        .await
        .unwrap();

    // Only 2 units remain with the seller; the second acceptance must fail
    // itemized and change nothing.
    let result = app
        .services
        .returns
        .accept_return(AcceptReturnCommand {
            actor: app.owner.clone(),
            return_id: second.return_id,
        })
        .await;

    match result {
        Err(ServiceError::InsufficientStock(shortages)) => {
            assert_eq!(shortages[0].requested, 8);
            assert_eq!(shortages[0].available, 2);
        }
        other => panic!("expected shortage, got {:?}", other.map(|r| r.return_id)),
    }
    assert_eq!(app.seller_stock(app.seller_id, product).await, 2);
    assert_eq!(app.company_stock(product).await, 8);

    // The failed acceptance did not flip the status either.
    let (stored, _) = app
        .services
        .returns
        .get_return(second.return_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReturnStatus::AwaitingConfirmation);
    app.assert_conserved(product).await;
}

#[tokio::test]
async fn seller_cannot_accept_their_own_return() {
    let app = TestApp::new().await;
    let product = app.seed_product("RET-6", dec!(1.00)).await;
    stock_seller(&app, product, 3).await;

    let created = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 3),
            notes: None,
        })
        .await
        .unwrap();

    let result = app
        .services
        .returns
        .accept_return(AcceptReturnCommand {
            actor: app.seller.clone(),
            return_id: created.return_id,
        })
        .await;

    assert_matches!(result, Err(ServiceError::Forbidden(_)));
    assert_eq!(app.seller_stock(app.seller_id, product).await, 3);
}

#[tokio::test]
async fn seller_cannot_raise_a_return_for_another_seller() {
    let app = TestApp::new().await;
    let (other_seller_id, _other_actor) = app.seed_extra_seller("rival").await;
    let product = app.seed_product("RET-7", dec!(1.00)).await;
    stock_seller(&app, product, 3).await;

    let result = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: other_seller_id,
            items: one_line(product, 1),
            notes: None,
        })
        .await;

    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}
