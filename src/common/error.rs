// src/common/error.rs

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Taxonomia única de erros que atravessa services e handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Dados inválidos: {0}")]
    Validation(String),

    // Erros vindos do `validator` (payloads com #[derive(Validate)])
    #[error("Erro de validação")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Não autorizado: {0}")]
    Unauthorized(String),

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Recurso descontinuado: {0}")]
    Gone(String),

    #[error("Limite de requisições excedido")]
    TooManyRequests,

    // Dependência externa (ex.: JWKS do provedor) indisponível.
    // O guard de autenticação converte isto em 401.
    #[error("Falha em dependência externa: {0}")]
    Upstream(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    Database(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) | AppError::Bcrypt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// Junta as mensagens do `validator` em uma única string: "campo: mensagem; ..."
fn describe_field_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error, detail): (String, Option<String>) = match self {
            AppError::Validation(msg) => ("Dados inválidos.".into(), Some(msg)),
            AppError::InvalidFields(ref errors) => {
                ("Dados inválidos.".into(), Some(describe_field_errors(errors)))
            }
            AppError::Unauthorized(reason) => ("Unauthorized".into(), Some(reason)),
            AppError::Forbidden(reason) => ("Forbidden".into(), Some(reason)),
            AppError::NotFound(resource) => (format!("{} not found", resource), None),
            AppError::Conflict(msg) => ("Conflict".into(), Some(msg)),
            AppError::Gone(msg) => ("Gone".into(), Some(msg)),
            AppError::TooManyRequests => ("Too Many Requests".into(), None),
            AppError::Upstream(ref cause) => {
                tracing::error!("Falha em dependência externa: {}", cause);
                ("Bad Gateway".into(), None)
            }
            // Todos os outros erros viram 500. O detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ("Internal Server Error".into(), None)
            }
        };

        let body = match detail {
            Some(detail) => json!({ "error": error, "detail": detail }),
            None => json!({ "error": error }),
        };
        (status, Json(body)).into_response()
    }
}

// Rejeições dos extratores do Axum também saem no formato {"error", "detail"}
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_of(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_carries_detail() {
        let (status, body) = body_of(AppError::Validation("status inválido: X".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Dados inválidos.");
        assert_eq!(body["detail"], "status inválido: X");
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let (status, body) = body_of(AppError::Internal(anyhow::anyhow!("senha do banco"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn not_found_names_the_resource() {
        let (status, body) = body_of(AppError::NotFound("Client")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Client not found");
    }

    #[tokio::test]
    async fn upstream_is_bad_gateway_without_detail() {
        let (status, body) = body_of(AppError::Upstream("jwks offline".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::Gone("x".into()).status_code(), StatusCode::GONE);
        assert_eq!(AppError::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
