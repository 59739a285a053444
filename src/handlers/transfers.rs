use crate::{
    auth::AuthUser,
    commands::transfers::accept_transfer_command::AcceptTransferCommand,
    commands::transfers::cancel_transfer_command::CancelTransferCommand,
    commands::transfers::create_transfer_command::{CreateTransferCommand, CreateTransferResult},
    commands::transfers::reject_transfer_command::RejectTransferCommand,
    commands::transfers::StockItemInput,
    entities::transfer::{self, TransferStatus},
    entities::transfer_item,
    entities::user::UserRole,
    errors::ServiceError,
    services::transfers::TransferScope,
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
pub struct CreateTransferRequest {
    pub seller_id: Uuid,
    pub items: Vec<StockItemInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct ProcessTransferRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferSummary {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub status: TransferStatus,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<transfer::Model> for TransferSummary {
    fn from(model: transfer::Model) -> Self {
        Self {
            id: model.id,
            seller_id: model.seller_id,
            status: model.status,
            total_items: model.total_items,
            created_at: model.created_at,
            processed_at: model.processed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferItemView {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: rust_decimal::Decimal,
}

impl From<transfer_item::Model> for TransferItemView {
    fn from(model: transfer_item::Model) -> Self {
        Self {
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferDetail {
    #[serde(flatten)]
    pub summary: TransferSummary,
    pub items: Vec<TransferItemView>,
}

pub async fn create_transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateTransferResult>>), ServiceError> {
    let command = CreateTransferCommand {
        company_id: actor.company_id,
        actor,
        seller_id: payload.seller_id,
        items: payload.items,
        notes: payload.notes,
    };
    let created = state.services.transfers.create_transfer(command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn accept_transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let result = state
        .services
        .transfers
        .accept_transfer(AcceptTransferCommand {
            actor,
            transfer_id: id,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "transfer_id": result.transfer_id,
        "status": result.status,
        "items_moved": result.items_moved,
    }))))
}

pub async fn reject_transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ProcessTransferRequest>>,
) -> ApiResult<serde_json::Value> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let result = state
        .services
        .transfers
        .reject_transfer(RejectTransferCommand {
            actor,
            transfer_id: id,
            reason,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "transfer_id": result.transfer_id,
        "status": result.status,
        "items_moved": result.items_moved,
    }))))
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let result = state
        .services
        .transfers
        .cancel_transfer(CancelTransferCommand {
            actor,
            transfer_id: id,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "transfer_id": result.transfer_id,
        "status": result.status,
    }))))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TransferDetail> {
    match state.services.transfers.get_transfer(id).await? {
        Some((header, items)) if header.company_id == actor.company_id => {
            Ok(Json(ApiResponse::success(TransferDetail {
                summary: header.into(),
                items: items.into_iter().map(Into::into).collect(),
            })))
        }
        _ => Err(ServiceError::NotFound(format!("Transfer {} not found", id))),
    }
}

pub async fn list_transfers(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<TransferSummary>> {
    let (page, limit) = query.clamped();
    let status = query
        .status
        .as_deref()
        .map(parse_transfer_status)
        .transpose()?;
    let scope = scope_for(&actor)?;

    let (records, total) = state
        .services
        .transfers
        .list_transfers(scope, status, page, limit)
        .await?;

    let items: Vec<TransferSummary> = records.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

/// Sellers see their own transfers; owners/admins see the whole company.
fn scope_for(actor: &AuthUser) -> Result<TransferScope, ServiceError> {
    match actor.role {
        UserRole::Owner | UserRole::Admin => Ok(TransferScope::Company(actor.company_id)),
        UserRole::Seller => {
            let seller_id = crate::auth::policy::acting_seller_id(actor)?;
            Ok(TransferScope::Seller(seller_id))
        }
    }
}

fn parse_transfer_status(s: &str) -> Result<TransferStatus, ServiceError> {
    match s.to_ascii_lowercase().as_str() {
        "created" => Ok(TransferStatus::Created),
        "accepted" => Ok(TransferStatus::Accepted),
        "rejected" => Ok(TransferStatus::Rejected),
        "canceled" => Ok(TransferStatus::Canceled),
        other => Err(ServiceError::ValidationError(format!(
            "unknown transfer status filter: {}",
            other
        ))),
    }
}
