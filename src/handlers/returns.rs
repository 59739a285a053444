use crate::{
    auth::AuthUser,
    commands::returns::accept_return_command::AcceptReturnCommand,
    commands::returns::create_return_command::{CreateReturnCommand, CreateReturnResult},
    commands::returns::reject_return_command::RejectReturnCommand,
    commands::transfers::StockItemInput,
    entities::return_item,
    entities::return_request::{self, ReturnStatus},
    entities::user::UserRole,
    errors::ServiceError,
    services::returns::ReturnScope,
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
pub struct CreateReturnRequest {
    /// Seller handing stock back; optional for actors with a seller
    /// identity, which is then used directly.
    pub seller_id: Option<Uuid>,
    pub items: Vec<StockItemInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct RejectReturnRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnSummary {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub status: ReturnStatus,
    pub total_items: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<return_request::Model> for ReturnSummary {
    fn from(model: return_request::Model) -> Self {
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
pub struct ReturnItemView {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl From<return_item::Model> for ReturnItemView {
    fn from(model: return_item::Model) -> Self {
        Self {
            product_id: model.product_id,
            quantity: model.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnDetail {
    #[serde(flatten)]
    pub summary: ReturnSummary,
    pub items: Vec<ReturnItemView>,
}

pub async fn create_return(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateReturnRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateReturnResult>>), ServiceError> {
    let seller_id = match payload.seller_id.or(actor.seller_id) {
        Some(id) => id,
        None => {
            return Err(ServiceError::ValidationError(
                "seller_id is required when the actor has no seller identity".into(),
            ))
        }
    };
    let command = CreateReturnCommand {
        actor,
        seller_id,
        items: payload.items,
        notes: payload.notes,
    };
    let created = state.services.returns.create_return(command).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn accept_return(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let result = state
        .services
        .returns
        .accept_return(AcceptReturnCommand {
            actor,
            return_id: id,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "return_id": result.return_id,
        "status": result.status,
        "items_moved": result.items_moved,
    }))))
}

pub async fn reject_return(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectReturnRequest>>,
) -> ApiResult<serde_json::Value> {
    let reason = payload.and_then(|Json(p)| p.reason);
    let result = state
        .services
        .returns
        .reject_return(RejectReturnCommand {
            actor,
            return_id: id,
            reason,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "return_id": result.return_id,
        "status": result.status,
    }))))
}

pub async fn get_return(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReturnDetail> {
    match state.services.returns.get_return(id).await? {
        Some((header, items)) if header.company_id == actor.company_id => {
            Ok(Json(ApiResponse::success(ReturnDetail {
                summary: header.into(),
                items: items.into_iter().map(Into::into).collect(),
            })))
        }
        _ => Err(ServiceError::NotFound(format!("Return {} not found", id))),
    }
}

pub async fn list_returns(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<ReturnSummary>> {
    let (page, limit) = query.clamped();
    let status = query
        .status
        .as_deref()
        .map(parse_return_status)
        .transpose()?;
    let scope = match actor.role {
        UserRole::Owner | UserRole::Admin => ReturnScope::Company(actor.company_id),
        UserRole::Seller => ReturnScope::Seller(crate::auth::policy::acting_seller_id(&actor)?),
    };

    let (records, total) = state
        .services
        .returns
        .list_returns(scope, status, page, limit)
        .await?;

    let items: Vec<ReturnSummary> = records.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}

fn parse_return_status(s: &str) -> Result<ReturnStatus, ServiceError> {
    match s.to_ascii_lowercase().as_str() {
        "awaiting_confirmation" => Ok(ReturnStatus::AwaitingConfirmation),
        "accepted" => Ok(ReturnStatus::Accepted),
        "rejected" => Ok(ReturnStatus::Rejected),
        other => Err(ServiceError::ValidationError(format!(
            "unknown return status filter: {}",
            other
        ))),
    }
}
