//! SeaORM entities for the inventory transfer and reconciliation engine.

pub mod account;
pub mod company;
pub mod inventory_balance;
pub mod kit;
pub mod kit_item;
pub mod product;
pub mod quota_record;
pub mod quota_sale;
pub mod return_item;
pub mod return_request;
pub mod seller;
pub mod stock_movement;
pub mod transfer;
pub mod transfer_item;
pub mod user;
