// src/models/interaction.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::client::{ClientStatus, FollowUpState};

// Tipos conhecidos. O campo `type` é livre; estes são os que têm significado.
pub const CLIENT_CREATED: &str = "CLIENT_CREATED";
pub const NOTE: &str = "NOTE";
pub const STATUS_CHANGE: &str = "STATUS_CHANGE";
pub const FOLLOW_UP_SCHEDULED: &str = "FOLLOW_UP_SCHEDULED";

// Alias legado, tratado como NOTE
const OBSERVATION: &str = "OBSERVATION";

// Eventos que encerram o follow-up
const FOLLOW_UP_RESOLVED: [&str; 5] = [
    "FOLLOW_UP_DONE",
    "FOLLOW_UP_CANCELED",
    "FOLLOW_UP_CANCELLED",
    "FOLLOW_UP_LOST",
    "FOLLOW_UP_CLOSED",
];

// Evento imutável do histórico de um cliente
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: Uuid,
    pub client_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub observation: Option<String>,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInteractionPayload {
    pub client_id: Option<Uuid>,
    #[serde(rename = "type")]
    #[schema(example = "STATUS_CHANGE")]
    pub kind: Option<String>,
    #[schema(example = "Cliente pediu proposta por e-mail.")]
    pub observation: Option<String>,
    // Próximo status, usado apenas por STATUS_CHANGE
    #[schema(example = "In Progress")]
    pub explicit_next: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InteractionListParams {
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InteractionList {
    pub items: Vec<Interaction>,
}

/// Resolve o tipo efetivo da interação.
///
/// Sem tipo mas com observação, vira NOTE; o alias legado OBSERVATION também vira NOTE.
/// Retorna `None` quando não há como inferir.
pub fn resolve_kind(kind: Option<&str>, observation: Option<&str>) -> Option<String> {
    let kind = kind.map(str::trim).filter(|k| !k.is_empty());
    let has_observation = observation.map(str::trim).is_some_and(|o| !o.is_empty());

    match kind {
        Some(OBSERVATION) => Some(NOTE.to_string()),
        Some(k) => Some(k.to_string()),
        None if has_observation => Some(NOTE.to_string()),
        None => None,
    }
}

// Efeito colateral de uma interação sobre o cliente
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    None,
    SetStatus(ClientStatus),
    SetFollowUp(FollowUpState),
}

impl SideEffect {
    pub fn for_kind(kind: &str, explicit_next: Option<ClientStatus>) -> Self {
        match (kind, explicit_next) {
            (STATUS_CHANGE, Some(next)) => SideEffect::SetStatus(next),
            (FOLLOW_UP_SCHEDULED, _) => SideEffect::SetFollowUp(FollowUpState::Active),
            (k, _) if FOLLOW_UP_RESOLVED.contains(&k) => SideEffect::SetFollowUp(FollowUpState::None),
            // NOTE, CLIENT_CREATED e tipos desconhecidos
            _ => SideEffect::None,
        }
    }
}

// Estado do cliente antes e depois de aplicar o efeito
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from_status: ClientStatus,
    pub to_status: ClientStatus,
    pub follow_up_state: FollowUpState,
}

impl Transition {
    pub fn plan(status: ClientStatus, follow_up_state: FollowUpState, effect: SideEffect) -> Self {
        let (to_status, follow_up_after) = match effect {
            SideEffect::None => (status, follow_up_state),
            SideEffect::SetStatus(next) => (next, follow_up_state),
            SideEffect::SetFollowUp(state) => (status, state),
        };
        Self {
            from_status: status,
            to_status,
            follow_up_state: follow_up_after,
        }
    }

    pub fn changes_client(&self, follow_up_before: FollowUpState) -> bool {
        self.from_status != self.to_status || self.follow_up_state != follow_up_before
    }
}
