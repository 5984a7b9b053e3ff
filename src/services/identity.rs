// src/services/identity.rs

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{
    decode, decode_header,
    errors::ErrorKind,
    jwk::JwkSet,
    Algorithm, DecodingKey, Header, Validation,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AuthSettings,
    models::auth::{Role, VerifiedIdentity},
};

pub const KEY_SET_TTL: Duration = Duration::from_secs(15 * 60);

// Tolerância para relógios adiantados no `nbf`
const NOT_BEFORE_SKEW_SECS: i64 = 60;

// =============================================================================
//  BUSCA DO JWKS
// =============================================================================

#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<JwkSet, AppError>;
}

pub struct HttpKeySetFetcher {
    client: reqwest::Client,
}

impl HttpKeySetFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self, url: &str) -> Result<JwkSet, AppError> {
        tracing::info!("🔑 Buscando chaves públicas em {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("JWKS inacessível ({}): {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "JWKS respondeu {} ({})",
                response.status(),
                url
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AppError::Upstream(format!("JWKS malformado ({}): {}", url, e)))
    }
}

struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Cache em memória dos conjuntos de chaves, por URL, com expiração fixa.
///
/// Leituras concorrentes não bloqueiam umas às outras. Duas requisições que
/// encontram o cache vazio ao mesmo tempo podem buscar duas vezes; a última
/// escrita vence.
pub struct KeySetCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedKeySet>>,
}

impl KeySetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_or_fetch(
        &self,
        url: &str,
        fetcher: &dyn KeySetFetcher,
    ) -> Result<Arc<JwkSet>, AppError> {
        {
            let entries = self.entries.read().await;
            let fresh = entries
                .get(url)
                .filter(|cached| cached.fetched_at.elapsed() < self.ttl);
            if let Some(cached) = fresh {
                tracing::debug!("JWKS em cache para {}", url);
                return Ok(cached.keys.clone());
            }
        }

        let keys = Arc::new(fetcher.fetch(url).await?);
        self.entries.write().await.insert(
            url.to_string(),
            CachedKeySet {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(keys)
    }
}

// =============================================================================
//  NORMALIZAÇÃO DAS CLAIMS
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProviderClaims {
    sub: String,
    exp: i64,
    // Só a presença importa
    #[allow(dead_code)]
    iat: i64,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

// Onde procurar um valor dentro das claims
#[derive(Debug, Clone, Copy)]
enum ClaimSource {
    TopLevel(&'static str),
    UserMetadata(&'static str),
    AppMetadata(&'static str),
}

// Ordem de preferência: o primeiro valor não vazio vence
const EMAIL_SOURCES: [ClaimSource; 3] = [
    ClaimSource::TopLevel("email"),
    ClaimSource::UserMetadata("email"),
    ClaimSource::AppMetadata("email"),
];

const ROLE_SOURCES: [ClaimSource; 4] = [
    ClaimSource::UserMetadata("role"),
    ClaimSource::UserMetadata("requested_role"),
    ClaimSource::AppMetadata("requested_role"),
    ClaimSource::AppMetadata("role"),
];

impl ClaimSource {
    fn read<'a>(&self, claims: &'a Map<String, Value>) -> Option<&'a str> {
        let value = match self {
            ClaimSource::TopLevel(key) => claims.get(*key),
            ClaimSource::UserMetadata(key) => claims.get("user_metadata").and_then(|m| m.get(*key)),
            ClaimSource::AppMetadata(key) => claims.get("app_metadata").and_then(|m| m.get(*key)),
        };
        value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

fn first_claim<'a>(claims: &'a Map<String, Value>, sources: &[ClaimSource]) -> Option<&'a str> {
    sources.iter().find_map(|source| source.read(claims))
}

pub(crate) fn normalize_email(claims: &Map<String, Value>) -> Option<String> {
    first_claim(claims, &EMAIL_SOURCES).map(str::to_lowercase)
}

// Papel fora da lista permitida (ou ausente) vira BROKER
pub(crate) fn normalize_role(claims: &Map<String, Value>, allowed: &[Role]) -> Role {
    first_claim(claims, &ROLE_SOURCES)
        .and_then(|raw| raw.parse::<Role>().ok())
        .filter(|role| allowed.contains(role))
        .unwrap_or(Role::Broker)
}

fn strip_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => raw,
    }
}

fn is_symmetric(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn is_asymmetric(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
            | Algorithm::EdDSA
    )
}

fn rejection(error: &jsonwebtoken::errors::Error) -> AppError {
    let reason = match error.kind() {
        ErrorKind::ExpiredSignature => "Token expirado",
        ErrorKind::InvalidIssuer => "Emissor do token inválido",
        ErrorKind::InvalidAudience => "Audiência do token inválida",
        ErrorKind::InvalidSignature => "Assinatura do token inválida",
        ErrorKind::InvalidAlgorithm => "Algoritmo do token não suportado",
        ErrorKind::MissingRequiredClaim(_) => "Claim obrigatória ausente",
        _ => "Token inválido",
    };
    tracing::warn!("Token rejeitado: {} ({:?})", reason, error.kind());
    AppError::Unauthorized(reason.into())
}

// =============================================================================
//  VERIFICADOR
// =============================================================================

#[derive(Clone)]
pub struct IdentityVerifier {
    settings: Arc<AuthSettings>,
    key_cache: Arc<KeySetCache>,
    fetcher: Arc<dyn KeySetFetcher>,
}

impl IdentityVerifier {
    pub fn new(settings: AuthSettings, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self {
            settings: Arc::new(settings),
            key_cache: Arc::new(KeySetCache::new(KEY_SET_TTL)),
            fetcher,
        }
    }

    pub fn with_key_set_ttl(mut self, ttl: Duration) -> Self {
        self.key_cache = Arc::new(KeySetCache::new(ttl));
        self
    }

    /// Valida o valor cru do header `Authorization` e devolve a identidade normalizada.
    ///
    /// Falhas de token viram `Unauthorized`; falha ao buscar o JWKS vira `Upstream`.
    pub async fn verify(&self, bearer_header: &str) -> Result<VerifiedIdentity, AppError> {
        let token = strip_bearer(bearer_header);
        if token.is_empty() {
            return Err(AppError::Unauthorized("Token ausente".into()));
        }

        let header = decode_header(token).map_err(|e| rejection(&e))?;
        let key = self.decoding_key(&header).await?;

        let token_data =
            decode::<ProviderClaims>(token, &key, &self.validation(header.alg)).map_err(|e| rejection(&e))?;
        let claims = token_data.claims;

        let now = Utc::now().timestamp();
        if claims.exp <= now {
            return Err(AppError::Unauthorized("Token expirado".into()));
        }
        if claims.nbf.is_some_and(|nbf| nbf > now + NOT_BEFORE_SKEW_SECS) {
            return Err(AppError::Unauthorized("Token ainda não é válido".into()));
        }

        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Subject do token não é um UUID".into()))?;

        Ok(VerifiedIdentity {
            subject,
            email: normalize_email(&claims.extra),
            role: normalize_role(&claims.extra, &self.settings.allowed_roles),
            expires_at: claims.exp,
        })
    }

    async fn decoding_key(&self, header: &Header) -> Result<DecodingKey, AppError> {
        if is_symmetric(header.alg) {
            let secret = self
                .settings
                .jwt_secret
                .as_deref()
                .ok_or_else(|| AppError::Unauthorized("Segredo HMAC não configurado".into()))?;
            return Ok(DecodingKey::from_secret(secret.as_bytes()));
        }

        if !is_asymmetric(header.alg) {
            return Err(AppError::Unauthorized("Algoritmo do token não suportado".into()));
        }

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Token sem kid".into()))?;
        let url = self
            .settings
            .jwks_url
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("JWKS não configurado".into()))?;

        let key_set = self.key_cache.get_or_fetch(url, self.fetcher.as_ref()).await?;
        let jwk = key_set
            .find(kid)
            .ok_or_else(|| AppError::Unauthorized("Chave de assinatura não encontrada".into()))?;

        DecodingKey::from_jwk(jwk).map_err(|e| rejection(&e))
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        match &self.settings.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }
        validation
    }
}
