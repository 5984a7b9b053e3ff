// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::WithRejection;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, RequireRole},
    },
    models::auth::{MeResponse, ProfileView, RegisterUserPayload, RoutingHint, UserView},
};

// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    responses(
        (status = 410, description = "Login local descontinuado; use o provedor de identidade")
    )
)]
pub async fn login() -> AppError {
    AppError::Gone(
        "O login local foi descontinuado. Autentique-se no provedor de identidade e envie o token como Bearer."
            .into(),
    )
}

// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = UserView),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas ADMIN"),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn register(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminOnly>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterUserPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = app_state.auth_service.register_user(&payload).await?;

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

// GET /api/v1/auth/me
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Dados do usuário logado", body = UserView),
        (status = 401, description = "Não autorizado"),
        (status = 404, description = "Usuário local não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn auth_me(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state
        .auth_service
        .find_user(auth.user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(UserView::from(&user)))
}

// GET /api/v1/me
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Identidade, perfil e rota sugerida", body = MeResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn me(auth: AuthenticatedUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserView::from(&auth.user),
        profile: ProfileView::from(&auth.profile),
        routing: RoutingHint::for_user(auth.user.role, auth.profile.is_active),
        claims_role: auth.identity.role,
    })
}
