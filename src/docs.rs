// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::auth_me,
        handlers::auth::me,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::export_clients,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,

        // --- Interactions ---
        handlers::interactions::create_interaction,
        handlers::interactions::list_interactions,

        // --- Analytics ---
        handlers::analytics::broker_kpis,
        handlers::analytics::productivity,
        handlers::analytics::funnel,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::UserView,
            models::auth::ProfileView,
            models::auth::RoutingHint,
            models::auth::MeResponse,
            models::auth::RegisterUserPayload,

            // --- Clients ---
            models::client::ClientStatus,
            models::client::FollowUpState,
            models::client::Client,
            models::client::ClientDetail,
            models::client::CreateClientPayload,
            models::client::UpdateClientPayload,

            // --- Interactions ---
            models::interaction::Interaction,
            models::interaction::InteractionList,
            models::interaction::CreateInteractionPayload,

            // --- Analytics ---
            models::analytics::BrokerKpis,
            models::analytics::ProductivityEntry,
            models::analytics::ProductivitySeries,
            models::analytics::FunnelStage,
            models::analytics::Funnel,
        )
    ),
    tags(
        (name = "Health", description = "Liveness e conexão com o banco"),
        (name = "Auth", description = "Identidade, perfil e registro"),
        (name = "Clients", description = "Cadastro de clientes (leads)"),
        (name = "Interactions", description = "Histórico de interações"),
        (name = "Analytics", description = "Indicadores do painel")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
