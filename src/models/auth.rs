// src/models/auth.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Broker,
    Manager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Broker, Role::Manager, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Broker => "BROKER",
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BROKER" => Ok(Role::Broker),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("papel desconhecido: {}", other)),
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Identidade já validada pelo verificador de tokens
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    pub subject: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub expires_at: i64,
}

// Quem está agindo: id local + papel local (autoritativo para o RBAC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }
}

// Visão pública do usuário (GET /auth/me e POST /auth/register)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub metadata: Value,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            phone_number: profile.phone_number.clone(),
            address: profile.address.clone(),
            avatar_url: profile.avatar_url.clone(),
            is_active: profile.is_active,
            metadata: profile.metadata.clone(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutingHint {
    pub target: String,
    pub reason: String,
}

impl RoutingHint {
    // Para onde o frontend deve mandar o usuário depois do login
    pub fn for_user(role: Role, profile_active: bool) -> Self {
        let (target, reason) = if !profile_active {
            ("/onboarding", "profile_inactive")
        } else {
            match role {
                Role::Admin => ("/admin", "role=ADMIN"),
                Role::Manager => ("/manager", "role=MANAGER"),
                Role::Broker => ("/app", "role=BROKER"),
            }
        };
        Self {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserView,
    pub profile: ProfileView,
    pub routing: RoutingHint,
    // Papel normalizado do token. Informativo: o RBAC usa o papel local.
    pub claims_role: Role,
}

// Dados para registro de um novo usuário (feito por um ADMIN)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Joana Corretora")]
    pub name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "joana@imobiliaria.com")]
    pub email: String,

    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: String,

    #[serde(default)]
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("manager".parse::<Role>(), Ok(Role::Manager));
        assert_eq!(" ADMIN ".parse::<Role>(), Ok(Role::Admin));
        assert!("OWNER".parse::<Role>().is_err());
    }

    #[test]
    fn inactive_profile_goes_to_onboarding() {
        let hint = RoutingHint::for_user(Role::Admin, false);
        assert_eq!(hint.target, "/onboarding");
        assert_eq!(hint.reason, "profile_inactive");
    }

    #[test]
    fn active_profile_routes_by_role() {
        assert_eq!(RoutingHint::for_user(Role::Admin, true).target, "/admin");
        assert_eq!(RoutingHint::for_user(Role::Manager, true).target, "/manager");
        assert_eq!(RoutingHint::for_user(Role::Broker, true).target, "/app");
    }

    #[test]
    fn register_payload_validation() {
        let payload = RegisterUserPayload {
            name: "Ana".into(),
            email: "nao-e-email".into(),
            password: "curta".into(),
            role: None,
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
