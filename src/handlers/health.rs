use crate::{ApiResponse, AppState};
use axum::{extract::State, response::Json};
use sea_orm::{ConnectionTrait, Statement};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
}

/// Liveness plus a cheap database round-trip.
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let backend = state.db.get_database_backend();
    let database = match state
        .db
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
    {
        Ok(_) => "up",
        Err(_) => "down",
    };

    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        database,
    }))
}
