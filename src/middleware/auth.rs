// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{Actor, Profile, User, VerifiedIdentity},
};

// Contexto do usuário autenticado, inserido nos extensions da requisição
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub profile: Profile,
    pub identity: VerifiedIdentity,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }
}

/// Valida o bearer token e garante o usuário local antes de chegar no handler.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Header Authorization ausente".into()))?;

    // Falha ao buscar o JWKS também sai como 401
    let identity = app_state
        .identity_verifier
        .verify(header)
        .await
        .map_err(|e| match e {
            AppError::Upstream(cause) => {
                tracing::warn!("JWKS indisponível, token recusado: {}", cause);
                AppError::Unauthorized("Não foi possível validar o token".into())
            }
            other => other,
        })?;

    let (user, profile) = app_state
        .auth_service
        .resolve_identity(identity.subject, identity.email.as_deref())
        .await?;

    request.extensions_mut().insert(AuthenticatedUser {
        user,
        profile,
        identity,
    });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Usuário não autenticado".into()))
    }
}
