// src/handlers/analytics.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::analytics::{AnalyticsParams, BrokerKpis, Funnel, ProductivitySeries},
};

// GET /api/v1/analytics/broker-kpis
#[utoipa::path(
    get,
    path = "/api/v1/analytics/broker-kpis",
    tag = "Analytics",
    responses(
        (status = 200, description = "Cards do painel", body = BrokerKpis)
    ),
    security(("api_jwt" = []))
)]
pub async fn broker_kpis(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let kpis = app_state.analytics_service.broker_kpis(&auth.actor()).await?;
    Ok(Json(kpis))
}

// GET /api/v1/analytics/productivity
#[utoipa::path(
    get,
    path = "/api/v1/analytics/productivity",
    tag = "Analytics",
    params(AnalyticsParams),
    responses(
        (status = 200, description = "Interações por dia (UTC)", body = ProductivitySeries),
        (status = 400, description = "startDate/endDate ausentes ou inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn productivity(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Query(params), _): WithRejection<Query<AnalyticsParams>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let series = app_state
        .analytics_service
        .productivity(&auth.actor(), &params)
        .await?;
    Ok(Json(series))
}

// GET /api/v1/analytics/funnel
#[utoipa::path(
    get,
    path = "/api/v1/analytics/funnel",
    tag = "Analytics",
    params(AnalyticsParams),
    responses(
        (status = 200, description = "Clientes por etapa do funil", body = Funnel),
        (status = 400, description = "startDate/endDate ausentes ou inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn funnel(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    WithRejection(Query(params), _): WithRejection<Query<AnalyticsParams>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let funnel = app_state.analytics_service.funnel(&auth.actor(), &params).await?;
    Ok(Json(funnel))
}
