// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{AnalyticsRepository, ClientRepository, InteractionRepository, UserRepository},
    middleware::rate_limit::{build_limiter, IpRateLimiter},
    models::auth::Role,
    services::{
        analytics_service::AnalyticsService,
        auth::AuthService,
        client_service::ClientService,
        identity::{HttpKeySetFetcher, IdentityVerifier, KeySetFetcher},
        interaction_service::InteractionService,
    },
};

// Timeout fixo da busca do JWKS (falha fechada)
const KEY_SET_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

// Configuração do verificador de tokens
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub issuer: String,
    pub jwks_url: Option<String>,
    pub audience: Option<String>,
    pub jwt_secret: Option<String>,
    pub allowed_roles: Vec<Role>,
}

#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub cors_origins: Vec<String>,
    pub rate_limit_per_minute: u32,
    pub auth: AuthSettings,
    pub seed_admin: Option<SeedAdmin>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    // Lê as variáveis por uma função de busca (facilita os testes)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let provider_url = get("AUTH_PROVIDER_URL").map(|u| u.trim_end_matches('/').to_string());
        let jwt_secret = get("AUTH_JWT_SECRET");
        if provider_url.is_none() && jwt_secret.is_none() {
            bail!("Defina AUTH_PROVIDER_URL e/ou AUTH_JWT_SECRET para validar tokens");
        }

        let issuer = match (get("AUTH_JWT_ISSUER"), &provider_url) {
            (Some(iss), _) => iss.trim_end_matches('/').to_string(),
            (None, Some(url)) => format!("{}/auth/v1", url),
            (None, None) => bail!("AUTH_JWT_ISSUER deve ser definido quando AUTH_PROVIDER_URL está ausente"),
        };

        let jwks_url = get("AUTH_JWKS_URL")
            .or_else(|| provider_url.as_ref().map(|url| format!("{}/auth/v1/keys", url)));

        let allowed_roles = match get("ALLOWED_ROLES") {
            Some(csv) => csv
                .split(',')
                .filter_map(|r| r.parse::<Role>().ok())
                .collect(),
            None => Role::ALL.to_vec(),
        };

        let cors_origins = get("CORS_ORIGINS")
            .map(|csv| {
                csv.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]);

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS inválido")?,
            None => 5,
        };

        let rate_limit_per_minute = match get("RATE_LIMIT_PER_MINUTE") {
            Some(v) => v.parse().context("RATE_LIMIT_PER_MINUTE inválido")?,
            None => 60,
        };

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin {
                name: get("SEED_ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()),
                email: email.to_lowercase(),
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections,
            cors_origins,
            rate_limit_per_minute,
            auth: AuthSettings {
                issuer,
                jwks_url,
                audience: get("AUTH_JWT_AUDIENCE"),
                jwt_secret,
                allowed_roles,
            },
            seed_admin,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub identity_verifier: IdentityVerifier,
    pub rate_limiter: Arc<IpRateLimiter>,
    pub auth_service: AuthService,
    pub client_service: ClientService,
    pub interaction_service: InteractionService,
    pub analytics_service: AnalyticsService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Settings::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let fetcher = HttpKeySetFetcher::new(KEY_SET_FETCH_TIMEOUT)?;
        Ok(Self::from_parts(settings, db_pool, Arc::new(fetcher)))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(settings: Settings, db_pool: PgPool, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let interaction_repo = InteractionRepository::new(db_pool.clone());
        let analytics_repo = AnalyticsRepository::new(db_pool.clone());

        let identity_verifier = IdentityVerifier::new(settings.auth.clone(), fetcher);
        let rate_limiter = Arc::new(build_limiter(settings.rate_limit_per_minute));

        let auth_service = AuthService::new(user_repo, db_pool.clone());
        let client_service = ClientService::new(
            client_repo.clone(),
            interaction_repo.clone(),
            db_pool.clone(),
        );
        let interaction_service = InteractionService::new(client_repo, interaction_repo, db_pool.clone());
        let analytics_service = AnalyticsService::new(analytics_repo);

        Self {
            db_pool,
            settings: Arc::new(settings),
            identity_verifier,
            rate_limiter,
            auth_service,
            client_service,
            interaction_service,
            analytics_service,
        }
    }
}
