// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::auth::{Actor, Role},
};

/// Resultado de uma decisão de acesso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(&'static str),
}

impl Access {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny(reason) => Err(AppError::Forbidden(reason.into())),
        }
    }
}

/// BROKER só age sobre o que é dele; MANAGER e ADMIN agem sobre qualquer recurso.
///
/// Função pura: quem chama já carregou o recurso (NotFound vem antes).
pub fn decide(role: Role, resource_owner_id: Option<Uuid>, acting_user_id: Uuid) -> Access {
    match role {
        Role::Manager | Role::Admin => Access::Allow,
        Role::Broker if resource_owner_id == Some(acting_user_id) => Access::Allow,
        Role::Broker => Access::Deny("Este cliente pertence a outro corretor."),
    }
}

// Exclusão é destrutiva: só ADMIN, independente de quem é o dono
pub fn decide_delete(role: Role) -> Access {
    match role {
        Role::Admin => Access::Allow,
        _ => Access::Deny("Apenas administradores podem excluir clientes."),
    }
}

// Restrição de linhas para listagens: BROKER vê só os próprios registros
pub fn visibility_scope(actor: &Actor) -> Option<Uuid> {
    match actor.role {
        Role::Broker => Some(actor.user_id),
        Role::Manager | Role::Admin => None,
    }
}

/// Define quais papéis passam por um `RequireRole<T>`.
pub trait RoleRequirement: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

pub struct AdminOnly;

impl RoleRequirement for AdminOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin]
    }
}

/// Extrator que barra a rota para papéis fora de `T::allowed()`.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Usuário não autenticado".into()))?;

        if !T::allowed().contains(&user.user.role) {
            tracing::warn!(
                "⛔ Usuário {} ({}) sem papel para esta rota",
                user.user.id,
                user.user.role.as_str()
            );
            return Err(AppError::Forbidden("Papel insuficiente para esta operação.".into()));
        }

        Ok(RequireRole(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_acts_only_on_own_resources() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert_eq!(decide(Role::Broker, Some(me), me), Access::Allow);
        assert!(matches!(decide(Role::Broker, Some(other), me), Access::Deny(_)));
        // Cliente sem dono não é de ninguém
        assert!(matches!(decide(Role::Broker, None, me), Access::Deny(_)));
    }

    #[test]
    fn elevated_roles_act_on_anything() {
        let me = Uuid::new_v4();
        for role in [Role::Manager, Role::Admin] {
            assert_eq!(decide(role, Some(Uuid::new_v4()), me), Access::Allow);
            assert_eq!(decide(role, None, me), Access::Allow);
        }
    }

    #[test]
    fn only_admin_deletes() {
        assert_eq!(decide_delete(Role::Admin), Access::Allow);
        assert!(decide_delete(Role::Manager).into_result().is_err());
        assert!(decide_delete(Role::Broker).into_result().is_err());
    }

    #[test]
    fn listing_scope_follows_role() {
        let id = Uuid::new_v4();
        assert_eq!(visibility_scope(&Actor { user_id: id, role: Role::Broker }), Some(id));
        assert_eq!(visibility_scope(&Actor { user_id: id, role: Role::Manager }), None);
        assert_eq!(visibility_scope(&Actor { user_id: id, role: Role::Admin }), None);
    }
}
