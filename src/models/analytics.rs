// src/models/analytics.rs

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::error::AppError;

// 1. Cards do topo (GET /analytics/broker-kpis)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerKpis {
    pub total_leads: i64,
    pub initial_contact_leads: i64,
    pub in_progress_leads: i64,
    pub overdue_follow_ups: i64,
}

// 2. Produtividade: interações por dia
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityEntry {
    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductivitySeries {
    pub series: Vec<ProductivityEntry>,
}

// 3. Funil por etapa
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub stage: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    pub stages: Vec<FunnelStage>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsParams {
    #[param(example = "2025-03-01")]
    pub start_date: Option<String>,
    #[param(example = "2025-03-31")]
    pub end_date: Option<String>,
    // Ignorado para BROKER (sempre filtra pelo próprio usuário)
    pub broker_id: Option<Uuid>,
}

/// Intervalo de datas inclusivo, convertido para `[início, fim + 1 dia)` em UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AppError> {
        let (Some(start), Some(end)) = (
            start.map(str::trim).filter(|s| !s.is_empty()),
            end.map(str::trim).filter(|s| !s.is_empty()),
        ) else {
            return Err(AppError::Validation("startDate e endDate são obrigatórios".into()));
        };

        let start = parse_date(start, "startDate")?;
        let end = parse_date(end, "endDate")?;
        if start > end {
            return Err(AppError::Validation("startDate deve ser anterior a endDate".into()));
        }
        Ok(Self { start, end })
    }

    pub fn lower_bound(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    // Fim do dia final: meia-noite do dia seguinte (exclusivo)
    pub fn upper_bound(&self) -> DateTime<Utc> {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
    }
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, AppError> {
    // Aceita "2025-03-01" e também "2025-03-01T10:00:00Z" (só a data importa)
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .map_err(|_| AppError::Validation(format!("{} inválida: {}", field, raw)))
}
