use crate::{
    auth::{policy, AuthUser},
    commands::quota::record_sale_command::RecordSaleCommand,
    services::quota::QuotaStatus,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordSaleRequest {
    pub sale_id: Uuid,
}

pub async fn check_quota(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<QuotaStatus> {
    policy::ensure_account_member(&actor, account_id)?;
    let status = state.services.quota.check_quota(account_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn record_sale(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<RecordSaleRequest>,
) -> ApiResult<serde_json::Value> {
    let result = state
        .services
        .quota
        .record_sale(RecordSaleCommand {
            actor,
            account_id,
            sale_id: payload.sale_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "account_id": result.account_id,
        "sale_id": result.sale_id,
        "year_month": result.year_month,
        "sales_count": result.sales_count,
        "counted": true,
    }))))
}
