use crate::{
    auth::{policy, AuthUser},
    commands::inventory::receive_stock_command::{ReceiveStockCommand, ReceiveStockResult},
    entities::inventory_balance::{self, OwnerType},
    entities::stock_movement::{self, MovementReason},
    errors::ServiceError,
    ledger::StockOwner,
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReceiveStockRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceView {
    pub product_id: Uuid,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_balance::Model> for BalanceView {
    fn from(model: inventory_balance::Model) -> Self {
        Self {
            product_id: model.product_id,
            quantity: model.quantity,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementView {
    pub product_id: Uuid,
    pub delta: i32,
    pub reason: MovementReason,
    pub related_entity_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<stock_movement::Model> for MovementView {
    fn from(model: stock_movement::Model) -> Self {
        Self {
            product_id: model.product_id,
            delta: model.delta,
            reason: model.reason,
            related_entity_id: model.related_entity_id,
            actor_id: model.actor_id,
            created_at: model.created_at,
        }
    }
}

pub async fn receive_stock(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<ReceiveStockRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReceiveStockResult>>), ServiceError> {
    let command = ReceiveStockCommand {
        company_id: actor.company_id,
        actor,
        product_id: payload.product_id,
        quantity: payload.quantity,
    };
    let result = state.services.inventory.receive_stock(command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

pub async fn list_balances(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path((owner_type, owner_id)): Path<(String, Uuid)>,
) -> ApiResult<Vec<BalanceView>> {
    let owner = resolve_owner(&actor, &owner_type, owner_id)?;
    let rows = state.services.inventory.balances_for(owner).await?;
    Ok(Json(ApiResponse::success(
        rows.into_iter().map(Into::into).collect(),
    )))
}

pub async fn list_movements(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path((owner_type, owner_id)): Path<(String, Uuid)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<MovementView>> {
    let (page, limit) = query.clamped();
    let owner = resolve_owner(&actor, &owner_type, owner_id)?;
    let (records, total) = state
        .services
        .inventory
        .movements_for(owner, page, limit)
        .await?;
    let items: Vec<MovementView> = records.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Path-level owner resolution plus visibility policy: company balances are
/// visible to company members; seller balances to company managers and the
/// seller themself.
fn resolve_owner(
    actor: &AuthUser,
    owner_type: &str,
    owner_id: Uuid,
) -> Result<StockOwner, ServiceError> {
    let owner = match owner_type {
        "company" => StockOwner::Company(owner_id),
        "seller" => StockOwner::Seller(owner_id),
        other => {
            return Err(ServiceError::ValidationError(format!(
                "unknown owner type: {}",
                other
            )))
        }
    };
    match owner.owner_type() {
        OwnerType::Company => {
            if owner_id != actor.company_id {
                return Err(ServiceError::Forbidden(
                    "Actor does not belong to this company".into(),
                ));
            }
        }
        OwnerType::Seller => {
            if actor.seller_id != Some(owner_id) {
                policy::ensure_company_manager(actor, actor.company_id)?;
            }
        }
    }
    Ok(owner)
}
