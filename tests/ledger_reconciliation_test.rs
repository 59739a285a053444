//! Reconciliation tests over the inventory ledger: the conservation law
//! holds across mixed workflow sequences, and every balance change has its
//! movement-log row.

mod common;

use common::TestApp;
use fieldstock_api::commands::kits::create_kit_command::CreateKitCommand;
use fieldstock_api::commands::kits::reject_kit_command::RejectKitCommand;
use fieldstock_api::commands::returns::accept_return_command::AcceptReturnCommand;
use fieldstock_api::commands::returns::create_return_command::CreateReturnCommand;
use fieldstock_api::commands::transfers::accept_transfer_command::AcceptTransferCommand;
use fieldstock_api::commands::transfers::create_transfer_command::CreateTransferCommand;
use fieldstock_api::commands::transfers::reject_transfer_command::RejectTransferCommand;
use fieldstock_api::commands::transfers::StockItemInput;
use fieldstock_api::entities::stock_movement;
use fieldstock_api::ledger::StockOwner;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

fn one_line(product_id: Uuid, quantity: i32) -> Vec<StockItemInput> {
    vec![StockItemInput {
        product_id,
        quantity,
    }]
}

#[tokio::test]
async fn conservation_holds_across_a_mixed_sequence() {
    let app = TestApp::new().await;
    let (second_seller_id, second_seller) = app.seed_extra_seller("second").await;
    let product = app.seed_product("MIX-1", dec!(10.00)).await;
    app.receive_stock(product, 100).await;
    app.assert_conserved(product).await;

    // Transfer 30 to seller one and accept.
    let t1 = app
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            items: one_line(product, 30),
            notes: None,
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;
    app.services
        .transfers
        .accept_transfer(AcceptTransferCommand {
            actor: app.seller.clone(),
            transfer_id: t1.transfer_id,
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;

    // Transfer 20 to seller two and reject.
    let t2 = app
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: second_seller_id,
            items: one_line(product, 20),
            notes: None,
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;
    app.services
        .transfers
        .reject_transfer(RejectTransferCommand {
            actor: second_seller,
            transfer_id: t2.transfer_id,
            reason: None,
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;

    // Kit 25 to seller one, left pending (in flight).
    let kit = app
        .services
        .kits
        .create_kit(CreateKitCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            kit_date: chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            commission_percent: dec!(10),
            items: one_line(product, 25),
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;

    // Seller one returns 10, accepted.
    let ret = app
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
    app.services
        .returns
        .accept_return(AcceptReturnCommand {
            actor: app.owner.clone(),
            return_id: ret.return_id,
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;

    // Resolve the kit too.
    app.services
        .kits
        .reject_kit(RejectKitCommand {
            actor: app.seller.clone(),
            kit_id: kit.kit_id,
            reason: None,
        })
        .await
        .unwrap();
    app.assert_conserved(product).await;

    // Final positions: company 100 - 30 (accepted) + 10 (returned), seller 20.
    assert_eq!(app.company_stock(product).await, 80);
    assert_eq!(app.seller_stock(app.seller_id, product).await, 20);
    assert_eq!(app.seller_stock(second_seller_id, product).await, 0);
}

#[tokio::test]
async fn every_balance_change_has_a_movement_row() {
    let app = TestApp::new().await;
    let product = app.seed_product("MIX-2", dec!(1.00)).await;
    app.receive_stock(product, 12).await;

    let t = app
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            items: one_line(product, 12),
            notes: None,
        })
        .await
        .unwrap();
    app.services
        .transfers
        .accept_transfer(AcceptTransferCommand {
            actor: app.seller.clone(),
            transfer_id: t.transfer_id,
        })
        .await
        .unwrap();

    let ret = app
        .services
        .returns
        .create_return(CreateReturnCommand {
            actor: app.seller.clone(),
            seller_id: app.seller_id,
            items: one_line(product, 12),
            notes: None,
        })
        .await
        .unwrap();
    app.services
        .returns
        .accept_return(AcceptReturnCommand {
            actor: app.owner.clone(),
            return_id: ret.return_id,
        })
        .await
        .unwrap();

    // receipt +12, transfer_out -12, accept_incoming +12,
    // return_accept -12 (seller) and +12 (company).
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(product))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 5);
    let net: i64 = movements.iter().map(|m| m.delta as i64).sum();
    // Net of all movements equals units currently in the system.
    assert_eq!(net, 12);
    assert!(movements.iter().all(|m| m.delta != 0));
}

#[tokio::test]
async fn movement_log_is_scoped_per_owner() {
    let app = TestApp::new().await;
    let product = app.seed_product("MIX-3", dec!(2.00)).await;
    app.receive_stock(product, 6).await;

    let t = app
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            actor: app.owner.clone(),
            company_id: app.company_id,
            seller_id: app.seller_id,
            items: one_line(product, 6),
            notes: None,
        })
        .await
        .unwrap();
    app.services
        .transfers
        .accept_transfer(AcceptTransferCommand {
            actor: app.seller.clone(),
            transfer_id: t.transfer_id,
        })
        .await
        .unwrap();

    let (company_moves, company_total) = app
        .services
        .inventory
        .movements_for(StockOwner::Company(app.company_id), 1, 50)
        .await
        .unwrap();
    assert_eq!(company_total, 2); // receipt + transfer_out
    assert!(company_moves
        .iter()
        .all(|m| m.owner_id == app.company_id));

    let (seller_moves, seller_total) = app
        .services
        .inventory
        .movements_for(StockOwner::Seller(app.seller_id), 1, 50)
        .await
        .unwrap();
    assert_eq!(seller_total, 1); // accept_incoming
    assert_eq!(seller_moves[0].delta, 6);
}
