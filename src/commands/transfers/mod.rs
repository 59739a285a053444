pub mod accept_transfer_command;
pub mod cancel_transfer_command;
pub mod create_transfer_command;
pub mod reject_transfer_command;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One product line requested on a transfer or kit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct StockItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Line-item sanity shared by transfer, kit and return creation: a
/// non-empty list, strictly positive quantities, and every product at most
/// once so debits and snapshots stay one-to-one with items.
pub(crate) fn validate_items(items: &[StockItemInput]) -> Result<(), crate::errors::ServiceError> {
    if items.is_empty() {
        return Err(crate::errors::ServiceError::ValidationError(
            "at least one item is required".into(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for item in items {
        if item.quantity < 1 {
            return Err(crate::errors::ServiceError::ValidationError(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        if !seen.insert(item.product_id) {
            return Err(crate::errors::ServiceError::ValidationError(format!(
                "product {} appears more than once",
                item.product_id
            )));
        }
    }
    Ok(())
}
