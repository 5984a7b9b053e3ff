// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{PageParams, Pagination},
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::client::{ClientSearchParams, CreateClientPayload, UpdateClientPayload},
};

// GET /api/v1/clients
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "Clients",
    params(ClientSearchParams, PageParams),
    responses(
        (status = 200, description = "Página de clientes visíveis ao usuário", body = crate::common::pagination::Page<crate::models::client::Client>),
        (status = 400, description = "Filtro inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Query(search), _): WithRejection<Query<ClientSearchParams>, AppError>,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .client_service
        .list_clients(&auth.actor(), &search, Pagination::from_params(&page))
        .await?;

    Ok(Json(page))
}

// POST /api/v1/clients
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "Clients",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = crate::models::client::Client),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateClientPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state
        .client_service
        .create_client(&auth.actor(), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

// GET /api/v1/clients/export
#[utoipa::path(
    get,
    path = "/api/v1/clients/export",
    tag = "Clients",
    params(ClientSearchParams),
    responses(
        (status = 200, description = "CSV com os clientes visíveis", content_type = "text/csv", body = String)
    ),
    security(("api_jwt" = []))
)]
pub async fn export_clients(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Query(search), _): WithRejection<Query<ClientSearchParams>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let csv = app_state
        .client_service
        .export_csv(&auth.actor(), &search)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"clients.csv\""),
        ],
        csv,
    ))
}

// GET /api/v1/clients/{id}
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente com interações (mais recentes primeiro)", body = crate::models::client::ClientDetail),
        (status = 403, description = "Cliente de outro corretor"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .client_service
        .get_client_detail(&auth.actor(), id)
        .await?;

    Ok(Json(detail))
}

// PUT /api/v1/clients/{id}
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = UpdateClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = crate::models::client::Client),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Cliente de outro corretor"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(patch), _): WithRejection<Json<UpdateClientPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state
        .client_service
        .update_client(&auth.actor(), id, patch)
        .await?;

    Ok(Json(client))
}

// DELETE /api/v1/clients/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 204, description = "Cliente e interações removidos"),
        (status = 403, description = "Apenas ADMIN"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    app_state.client_service.delete_client(&auth.actor(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
