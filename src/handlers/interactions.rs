// src/handlers/interactions.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::interaction::{CreateInteractionPayload, Interaction, InteractionList, InteractionListParams},
};

// POST /api/v1/interactions
#[utoipa::path(
    post,
    path = "/api/v1/interactions",
    tag = "Interactions",
    request_body = CreateInteractionPayload,
    responses(
        (status = 201, description = "Interação registrada (e cliente atualizado, se for o caso)", body = Interaction),
        (status = 400, description = "clientId ou type ausente, ou status inválido"),
        (status = 403, description = "Cliente de outro corretor"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_interaction(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateInteractionPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let interaction = app_state
        .interaction_service
        .record_interaction(&auth.actor(), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(interaction)))
}

// GET /api/v1/interactions?clientId=...
#[utoipa::path(
    get,
    path = "/api/v1/interactions",
    tag = "Interactions",
    params(InteractionListParams),
    responses(
        (status = 200, description = "Interações do cliente, mais recentes primeiro", body = InteractionList),
        (status = 400, description = "clientId ausente ou inválido"),
        (status = 403, description = "Cliente de outro corretor"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_interactions(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Query(params), _): WithRejection<Query<InteractionListParams>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let raw = params
        .client_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("clientId é obrigatório".into()))?;
    let client_id = Uuid::parse_str(raw)
        .map_err(|_| AppError::Validation(format!("clientId inválido: {}", raw)))?;

    let items = app_state
        .interaction_service
        .list_for_client(&auth.actor(), client_id)
        .await?;

    Ok(Json(InteractionList { items }))
}
