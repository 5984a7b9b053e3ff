// src/models/client.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::interaction::Interaction;

// --- ENUMS ---

// Etapas do funil de vendas. Guardado como TEXT (com CHECK) no banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ClientStatus {
    #[serde(rename = "Initial Contact")]
    InitialContact,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Proposal")]
    Proposal,
    #[serde(rename = "Closed")]
    Closed,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Canceled")]
    Canceled,
}

impl ClientStatus {
    pub const ALL: [ClientStatus; 6] = [
        ClientStatus::InitialContact,
        ClientStatus::InProgress,
        ClientStatus::Proposal,
        ClientStatus::Closed,
        ClientStatus::Lost,
        ClientStatus::Canceled,
    ];

    // Etapas contadas pelo funil, na ordem
    pub const FUNNEL: [ClientStatus; 4] = [
        ClientStatus::InitialContact,
        ClientStatus::InProgress,
        ClientStatus::Proposal,
        ClientStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::InitialContact => "Initial Contact",
            ClientStatus::InProgress => "In Progress",
            ClientStatus::Proposal => "Proposal",
            ClientStatus::Closed => "Closed",
            ClientStatus::Lost => "Lost",
            ClientStatus::Canceled => "Canceled",
        }
    }
}

impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::InitialContact
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClientStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("status inválido: {}", s))
    }
}

impl TryFrom<String> for ClientStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// Estado do follow-up, independente do funil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FollowUpState {
    None,
    Active,
    Overdue,
    Completed,
    Canceled,
    Lost,
}

impl FollowUpState {
    pub const ALL: [FollowUpState; 6] = [
        FollowUpState::None,
        FollowUpState::Active,
        FollowUpState::Overdue,
        FollowUpState::Completed,
        FollowUpState::Canceled,
        FollowUpState::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpState::None => "None",
            FollowUpState::Active => "Active",
            FollowUpState::Overdue => "Overdue",
            FollowUpState::Completed => "Completed",
            FollowUpState::Canceled => "Canceled",
            FollowUpState::Lost => "Lost",
        }
    }
}

impl Default for FollowUpState {
    fn default() -> Self {
        FollowUpState::None
    }
}

impl fmt::Display for FollowUpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FollowUpState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FollowUpState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("followUpState inválido: {}", s))
    }
}

impl TryFrom<String> for FollowUpState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- CLIENTE (O Lead) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,

    #[sqlx(try_from = "String")]
    pub status: ClientStatus,

    pub observations: Option<String>,
    pub product: Option<String>,

    #[schema(value_type = Option<f64>, example = 123456.78)]
    pub property_value: Option<Decimal>,

    #[sqlx(try_from = "String")]
    pub follow_up_state: FollowUpState,

    // Referência "solta" para users.id (sem FK)
    pub owner_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Client {
    pub const CSV_HEADER: [&'static str; 11] = [
        "id",
        "name",
        "phone",
        "email",
        "source",
        "status",
        "followUpState",
        "product",
        "propertyValue",
        "createdAt",
        "updatedAt",
    ];

    // Uma linha do export, na mesma ordem de CSV_HEADER. Nulos viram "".
    pub fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.phone.clone(),
            self.email.clone().unwrap_or_default(),
            self.source.clone(),
            self.status.to_string(),
            self.follow_up_state.to_string(),
            self.product.clone().unwrap_or_default(),
            self.property_value.map(|v| v.to_string()).unwrap_or_default(),
            self.created_at.to_rfc3339(),
            self.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ]
    }
}

// Cliente + histórico (GET /clients/{id})
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub interactions: Vec<Interaction>,
}

// --- PAYLOADS ---

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    #[schema(example = "Maria da Silva")]
    pub name: Option<String>,
    #[schema(example = "85999990000")]
    pub phone: Option<String>,
    pub email: Option<String>,
    #[schema(example = "instagram")]
    pub source: Option<String>,
    #[schema(example = "Initial Contact")]
    pub status: Option<String>,
    pub observations: Option<String>,
    #[schema(example = "Apartamento")]
    pub product: Option<String>,
    #[schema(value_type = Option<f64>, example = 123456.78)]
    pub property_value: Option<Value>,
    #[schema(example = "None")]
    pub follow_up_state: Option<String>,
}

// Atualização parcial: só os campos presentes mudam.
// Para campos anuláveis, `Some(None)` significa "gravar NULL".
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientPayload {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    pub source: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub observations: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub product: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub property_value: Option<Option<Value>>,
    pub follow_up_state: Option<String>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClientSearchParams {
    // Busca livre em nome, telefone, e-mail e origem
    pub q: Option<String>,
    pub status: Option<String>,
}

// Filtro já validado
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub owner_id: Option<Uuid>,
    pub query: Option<String>,
    pub status: Option<ClientStatus>,
}

// 13 dígitos inteiros: limite da coluna NUMERIC(15,2)
const PROPERTY_VALUE_LIMIT: i64 = 10_000_000_000_000;

/// Converte o valor do imóvel para decimal exato, sem passar por ponto flutuante.
///
/// Números JSON são lidos pela sua representação textual; strings são aceitas
/// (vírgula decimal inclusive). Qualquer coisa que não seja um decimal válido
/// vira `None`: o valor é gravado como NULL em vez de rejeitar a requisição.
/// O mesmo vale para valores que não cabem em `NUMERIC(15,2)`.
pub fn parse_property_value(raw: &Value) -> Option<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().replace(',', "."),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .map(|v| v.round_dp(2))
        .filter(|v| v.abs() < Decimal::from(PROPERTY_VALUE_LIMIT))
}

// Texto opcional: vazio vira None
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
