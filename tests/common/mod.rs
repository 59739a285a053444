//! Shared harness for workflow integration tests: an in-memory SQLite
//! database with migrations applied and one company seeded.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectOptions, Database, EntityTrait, QueryFilter, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use axum::{routing::get, Router};
use fieldstock_api::{
    auth::AuthUser,
    config::AppConfig,
    db::DbPool,
    entities::{
        account::{self, PlanTier},
        company, inventory_balance,
        inventory_balance::OwnerType,
        kit, kit_item, product, seller, stock_movement,
        stock_movement::MovementReason,
        transfer, transfer_item,
        transfer::TransferStatus,
        kit::KitStatus,
        user::{self, UserRole},
    },
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use migrations::Migrator;
use sea_orm_migration::MigratorTrait;

pub const TEST_JWT_SECRET: &str =
    "integration_test_secret_key_that_is_at_least_64_characters_long_0123";

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub state: AppState,
    pub account_id: Uuid,
    pub company_id: Uuid,
    pub owner: AuthUser,
    pub seller: AuthUser,
    pub seller_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Fresh database, one account/company, an owner user and one active
    /// seller.
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        // A single connection keeps every query on the same in-memory
        // database.
        options
            .max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .sqlx_logging(false);
        let db = Database::connect(options).await.expect("test db connect");
        Migrator::up(&db, None).await.expect("migrations apply");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));

        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        let state = AppState {
            db: db.clone(),
            config,
            event_sender,
            services: services.clone(),
        };

        let account_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        let now = Utc::now();

        account::ActiveModel {
            id: Set(account_id),
            name: Set("Acme Distribution".into()),
            plan: Set(PlanTier::SoloFree),
            created_at: Set(now),
        }
        .insert(&*db)
        .await
        .expect("seed account");

        company::ActiveModel {
            id: Set(company_id),
            account_id: Set(account_id),
            name: Set("Acme".into()),
            created_at: Set(now),
        }
        .insert(&*db)
        .await
        .expect("seed company");

        let owner_user_id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(owner_user_id),
            company_id: Set(company_id),
            email: Set("owner@acme.test".into()),
            display_name: Set("Owner".into()),
            role: Set(UserRole::Owner),
            active: Set(true),
            created_at: Set(now),
        }
        .insert(&*db)
        .await
        .expect("seed owner user");

        let seller_user_id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(seller_user_id),
            company_id: Set(company_id),
            email: Set("seller@acme.test".into()),
            display_name: Set("Seller".into()),
            role: Set(UserRole::Seller),
            active: Set(true),
            created_at: Set(now),
        }
        .insert(&*db)
        .await
        .expect("seed seller user");

        let seller_id = Uuid::new_v4();
        seller::ActiveModel {
            id: Set(seller_id),
            company_id: Set(company_id),
            user_id: Set(seller_user_id),
            display_name: Set("Seller One".into()),
            active: Set(true),
            created_at: Set(now),
        }
        .insert(&*db)
        .await
        .expect("seed seller");

        let owner = AuthUser {
            user_id: owner_user_id,
            company_id,
            account_id,
            seller_id: None,
            role: UserRole::Owner,
            token_id: "test-owner".into(),
        };
        let seller_actor = AuthUser {
            user_id: seller_user_id,
            company_id,
            account_id,
            seller_id: Some(seller_id),
            role: UserRole::Seller,
            token_id: "test-seller".into(),
        };

        Self {
            db,
            services,
            state,
            account_id,
            company_id,
            owner,
            seller: seller_actor,
            seller_id,
            _event_task: event_task,
        }
    }

    /// Full HTTP surface, wired the way `main` wires it.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(fieldstock_api::handlers::health::health))
            .nest(
                "/api/v1",
                fieldstock_api::handlers::api_v1_routes(self.state.clone()),
            )
            .with_state(self.state.clone())
    }

    /// Bearer token for the given actor, signed with the test secret.
    pub fn token_for(&self, actor: &AuthUser) -> String {
        fieldstock_api::auth::issue_token(
            TEST_JWT_SECRET,
            actor.user_id,
            actor.company_id,
            actor.account_id,
            actor.seller_id,
            actor.role,
            600,
        )
        .expect("token issuance")
    }

    /// Registers a second active seller for multi-seller scenarios.
    pub async fn seed_extra_seller(&self, name: &str) -> (Uuid, AuthUser) {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(user_id),
            company_id: Set(self.company_id),
            email: Set(format!("{}@acme.test", name)),
            display_name: Set(name.to_string()),
            role: Set(UserRole::Seller),
            active: Set(true),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed extra user");

        let seller_id = Uuid::new_v4();
        seller::ActiveModel {
            id: Set(seller_id),
            company_id: Set(self.company_id),
            user_id: Set(user_id),
            display_name: Set(name.to_string()),
            active: Set(true),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed extra seller");

        let actor = AuthUser {
            user_id,
            company_id: self.company_id,
            account_id: self.account_id,
            seller_id: Some(seller_id),
            role: UserRole::Seller,
            token_id: format!("test-{}", name),
        };
        (seller_id, actor)
    }

    pub async fn seed_product(&self, sku: &str, unit_price: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            company_id: Set(self.company_id),
            name: Set(format!("Product {}", sku)),
            sku: Set(sku.to_string()),
            unit_price: Set(unit_price),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed product");
        id
    }

    /// Issues stock into company inventory through the real receipt command.
    pub async fn receive_stock(&self, product_id: Uuid, quantity: i32) {
        use fieldstock_api::commands::inventory::receive_stock_command::ReceiveStockCommand;
        self.services
            .inventory
            .receive_stock(ReceiveStockCommand {
                actor: self.owner.clone(),
                company_id: self.company_id,
                product_id,
                quantity,
            })
            .await
            .expect("receive stock");
    }

    pub async fn company_stock(&self, product_id: Uuid) -> i32 {
        self.balance(OwnerType::Company, self.company_id, product_id)
            .await
    }

    pub async fn seller_stock(&self, seller_id: Uuid, product_id: Uuid) -> i32 {
        self.balance(OwnerType::Seller, seller_id, product_id).await
    }

    async fn balance(&self, owner_type: OwnerType, owner_id: Uuid, product_id: Uuid) -> i32 {
        inventory_balance::Entity::find()
            .filter(inventory_balance::Column::OwnerType.eq(owner_type))
            .filter(inventory_balance::Column::OwnerId.eq(owner_id))
            .filter(inventory_balance::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await
            .expect("balance query")
            .map(|b| b.quantity)
            .unwrap_or(0)
    }

    /// Movement rows recorded for an entity, any owner side.
    pub async fn movements_related_to(&self, related: Uuid) -> Vec<stock_movement::Model> {
        stock_movement::Entity::find()
            .filter(stock_movement::Column::RelatedEntityId.eq(related))
            .all(&*self.db)
            .await
            .expect("movement query")
    }

    /// Conservation check for one product:
    /// company + all sellers + in-flight (created transfers, pending kits)
    /// must equal the total ever receipted.
    pub async fn assert_conserved(&self, product_id: Uuid) {
        let balances = inventory_balance::Entity::find()
            .filter(inventory_balance::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await
            .expect("balances");
        let held: i64 = balances.iter().map(|b| b.quantity as i64).sum();

        let mut in_flight: i64 = 0;
        let open_transfers = transfer::Entity::find()
            .filter(transfer::Column::Status.eq(TransferStatus::Created))
            .all(&*self.db)
            .await
            .expect("open transfers");
        for t in open_transfers {
            let items = transfer_item::Entity::find()
                .filter(transfer_item::Column::TransferId.eq(t.id))
                .filter(transfer_item::Column::ProductId.eq(product_id))
                .all(&*self.db)
                .await
                .expect("transfer items");
            in_flight += items.iter().map(|i| i.quantity as i64).sum::<i64>();
        }
        let open_kits = kit::Entity::find()
            .filter(kit::Column::Status.eq(KitStatus::Pending))
            .all(&*self.db)
            .await
            .expect("open kits");
        for k in open_kits {
            let items = kit_item::Entity::find()
                .filter(kit_item::Column::KitId.eq(k.id))
                .filter(kit_item::Column::ProductId.eq(product_id))
                .all(&*self.db)
                .await
                .expect("kit items");
            in_flight += items.iter().map(|i| i.qty_assigned as i64).sum::<i64>();
        }

        let receipts: i64 = stock_movement::Entity::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .filter(stock_movement::Column::Reason.eq(MovementReason::StockReceipt))
            .all(&*self.db)
            .await
            .expect("receipt movements")
            .iter()
            .map(|m| m.delta as i64)
            .sum();

        assert_eq!(
            held + in_flight,
            receipts,
            "conservation violated for product {}: held={} in_flight={} receipted={}",
            product_id,
            held,
            in_flight,
            receipts
        );
    }
}
