// src/db/analytics_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        analytics::{BrokerKpis, DateRange, FunnelStage, ProductivityEntry},
        client::{ClientStatus, FollowUpState},
    },
};

#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Cards do topo. owner_id = None conta todos os clientes.
    pub async fn broker_kpis(&self, owner_id: Option<Uuid>) -> Result<BrokerKpis, AppError> {
        let kpis = sqlx::query_as::<_, BrokerKpis>(
            r#"
            SELECT
                COUNT(*)                                    AS total_leads,
                COUNT(*) FILTER (WHERE status = $2)         AS initial_contact_leads,
                COUNT(*) FILTER (WHERE status = $3)         AS in_progress_leads,
                COUNT(*) FILTER (WHERE follow_up_state = $4) AS overdue_follow_ups
            FROM clients
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            "#,
        )
        .bind(owner_id)
        .bind(ClientStatus::InitialContact.as_str())
        .bind(ClientStatus::InProgress.as_str())
        .bind(FollowUpState::Overdue.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(kpis)
    }

    // 2. Interações por dia (UTC) dentro do intervalo
    pub async fn productivity(
        &self,
        range: &DateRange,
        user_id: Option<Uuid>,
    ) -> Result<Vec<ProductivityEntry>, AppError> {
        let series = sqlx::query_as::<_, ProductivityEntry>(
            r#"
            SELECT
                (created_at AT TIME ZONE 'UTC')::date AS date,
                COUNT(*)                               AS count
            FROM interactions
            WHERE created_at >= $1
              AND created_at < $2
              AND ($3::uuid IS NULL OR user_id = $3)
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(range.lower_bound())
        .bind(range.upper_bound())
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(series)
    }

    // 3. Funil: contagem por etapa, na ordem fixa. Etapas vazias aparecem com 0.
    pub async fn funnel(
        &self,
        range: &DateRange,
        owner_id: Option<Uuid>,
    ) -> Result<Vec<FunnelStage>, AppError> {
        let stages: Vec<String> = ClientStatus::FUNNEL
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, FunnelStage>(
            r#"
            SELECT status AS stage, COUNT(*) AS count
            FROM clients
            WHERE created_at >= $1
              AND created_at < $2
              AND ($3::uuid IS NULL OR owner_id = $3)
              AND status = ANY($4)
            GROUP BY status
            "#,
        )
        .bind(range.lower_bound())
        .bind(range.upper_bound())
        .bind(owner_id)
        .bind(&stages)
        .fetch_all(&self.pool)
        .await?;

        Ok(stages
            .into_iter()
            .map(|stage| {
                let count = rows
                    .iter()
                    .find(|row| row.stage == stage)
                    .map(|row| row.count)
                    .unwrap_or(0);
                FunnelStage { stage, count }
            })
            .collect())
    }
}
