use crate::{
    auth::AuthUser,
    commands::kits::accept_kit_command::AcceptKitCommand,
    commands::kits::create_kit_command::{CreateKitCommand, CreateKitResult},
    commands::kits::reject_kit_command::RejectKitCommand,
    commands::transfers::StockItemInput,
    entities::kit::{self, KitStatus},
    entities::kit_item,
    entities::user::UserRole,
    errors::ServiceError,
    services::kits::KitScope,
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateKitRequest {
    pub seller_id: Uuid,
    pub kit_date: NaiveDate,
    pub commission_percent: Decimal,
    pub items: Vec<StockItemInput>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct RejectKitRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KitSummary {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub kit_date: NaiveDate,
    pub commission_percent: Decimal,
    pub status: KitStatus,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl From<kit::Model> for KitSummary {
    fn from(model: kit::Model) -> Self {
        Self {
            id: model.id,
            seller_id: model.seller_id,
            kit_date: model.kit_date,
            commission_percent: model.commission_percent,
            status: model.status,
            assigned_at: model.assigned_at,
            accepted_at: model.accepted_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KitItemView {
    pub product_id: Uuid,
    pub qty_assigned: i32,
    pub unit_price: Decimal,
}

impl From<kit_item::Model> for KitItemView {
    fn from(model: kit_item::Model) -> Self {
        Self {
            product_id: model.product_id,
            qty_assigned: model.qty_assigned,
            unit_price: model.unit_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KitDetail {
    #[serde(flatten)]
    pub summary: KitSummary,
    pub items: Vec<KitItemView>,
}

pub async fn create_kit(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateKitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateKitResult>>), ServiceError> {
    let command = CreateKitCommand {
        company_id: actor.company_id,
        actor,
        seller_id: payload.seller_id,
        kit_date: payload.kit_date,
        commission_percent: payload.commission_percent,
        items: payload.items,
    };
    let created = state.services.kits.create_kit(command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn accept_kit(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let result = state
        .services
        .kits
        .accept_kit(AcceptKitCommand { actor, kit_id: id })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "kit_id": result.kit_id,
        "status": result.status,
        "items_moved": result.items_moved,
        "accepted_at": result.accepted_at,
    }))))
}

pub async fn reject_kit(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectKitRequest>>,
) -> ApiResult<serde_json::Value> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let result = state
        .services
        .kits
        .reject_kit(RejectKitCommand {
            actor,
            kit_id: id,
            reason,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "kit_id": result.kit_id,
        "status": result.status,
        "items_moved": result.items_moved,
    }))))
}

pub async fn get_kit(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<KitDetail> {
    match state.services.kits.get_kit(id).await? {
        Some((header, items)) if header.company_id == actor.company_id => {
            Ok(Json(ApiResponse::success(KitDetail {
                summary: header.into(),
                items: items.into_iter().map(Into::into).collect(),
            })))
        }
        _ => Err(ServiceError::NotFound(format!("Kit {} not found", id))),
    }
}

pub async fn list_kits(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<KitSummary>> {
    let (page, limit) = query.clamped();
    let status = query.status.as_deref().map(parse_kit_status).transpose()?;
    let scope = match actor.role {
        UserRole::Owner | UserRole::Admin => KitScope::Company(actor.company_id),
        UserRole::Seller => KitScope::Seller(crate::auth::policy::acting_seller_id(&actor)?),
    };

    let (records, total) = state
        .services
        .kits
        .list_kits(scope, status, page, limit)
        .await?;

    let items: Vec<KitSummary> = records.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

fn parse_kit_status(s: &str) -> Result<KitStatus, ServiceError> {
    match s.to_ascii_lowercase().as_str() {
        "pending" => Ok(KitStatus::Pending),
        "accepted" => Ok(KitStatus::Accepted),
        "rejected" => Ok(KitStatus::Rejected),
        other => Err(ServiceError::ValidationError(format!(
            "unknown kit status filter: {}",
            other
        ))),
    }
}
