// src/handlers/health.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{config::AppState, db};

// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "API e banco de dados respondendo"),
        (status = 500, description = "Banco de dados indisponível")
    )
)]
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    match db::ping(&app_state.db_pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "database": "ok" }))),
        Err(e) => {
            tracing::error!("Health check falhou: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Database unavailable", "detail": e.to_string() })),
            )
        }
    }
}
