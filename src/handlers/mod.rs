pub mod health;
pub mod inventory;
pub mod kits;
pub mod quota;
pub mod returns;
pub mod transfers;

use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub transfers: Arc<crate::services::transfers::TransferService>,
    pub kits: Arc<crate::services::kits::KitService>,
    pub returns: Arc<crate::services::returns::ReturnService>,
    pub quota: Arc<crate::services::quota::QuotaService>,
    pub inventory: Arc<crate::services::inventory::InventoryService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            transfers: Arc::new(crate::services::transfers::TransferService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            kits: Arc::new(crate::services::kits::KitService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            returns: Arc::new(crate::services::returns::ReturnService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            quota: Arc::new(crate::services::quota::QuotaService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            inventory: Arc::new(crate::services::inventory::InventoryService::new(
                db_pool,
                event_sender,
            )),
        }
    }
}

/// Authenticated /api/v1 surface.
pub fn api_v1_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/transfers",
            post(transfers::create_transfer).get(transfers::list_transfers),
        )
        .route("/transfers/:id", get(transfers::get_transfer))
        .route("/transfers/:id/accept", post(transfers::accept_transfer))
        .route("/transfers/:id/reject", post(transfers::reject_transfer))
        .route("/transfers/:id/cancel", post(transfers::cancel_transfer))
        .route("/kits", post(kits::create_kit).get(kits::list_kits))
        .route("/kits/:id", get(kits::get_kit))
        .route("/kits/:id/accept", post(kits::accept_kit))
        .route("/kits/:id/reject", post(kits::reject_kit))
        .route(
            "/returns",
            post(returns::create_return).get(returns::list_returns),
        )
        .route("/returns/:id", get(returns::get_return))
        .route("/returns/:id/accept", post(returns::accept_return))
        .route("/returns/:id/reject", post(returns::reject_return))
        .route("/quota/:account_id", get(quota::check_quota))
        .route("/quota/:account_id/sales", post(quota::record_sale))
        .route("/inventory/receipts", post(inventory::receive_stock))
        .route(
            "/inventory/:owner_type/:owner_id",
            get(inventory::list_balances),
        )
        .route(
            "/inventory/:owner_type/:owner_id/movements",
            get(inventory::list_movements),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::auth::require_auth,
        ))
}
