//src/main.rs

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, rate_limit::rate_limit_guard};

// Limpeza periódica das chaves antigas do rate limiter
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some(seed) = app_state.settings.seed_admin.clone() {
        match app_state.auth_service.seed_admin(&seed).await {
            Ok(admin) => tracing::info!("👑 Administrador {} pronto ({})", admin.email, admin.id),
            Err(e) => tracing::error!("Falha ao criar o administrador inicial: {}", e),
        }
    }

    let limiter = app_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.retain_recent();
        }
    });

    let addr = app_state.settings.bind_addr.clone();
    let app = app(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", addr);
    tracing::info!("📚 Swagger UI em http://{}/swagger-ui", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Erro no servidor Axum");
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Origem CORS ignorada: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route")
}

pub fn app(app_state: AppState) -> Router {
    // Rotas públicas
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/login", post(handlers::auth::login));

    // Rotas protegidas: rate limit -> token -> usuário local
    let protected_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/me", get(handlers::auth::auth_me))
        .route("/me", get(handlers::auth::me))
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route("/clients/export", get(handlers::clients::export_clients))
        .route(
            "/clients/{id}",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/interactions",
            get(handlers::interactions::list_interactions)
                .post(handlers::interactions::create_interaction),
        )
        .route("/analytics/broker-kpis", get(handlers::analytics::broker_kpis))
        .route("/analytics/productivity", get(handlers::analytics::productivity))
        .route("/analytics/funnel", get(handlers::analytics::funnel))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), rate_limit_guard));

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(cors_layer(&app_state.settings.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
