// src/services/analytics_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AnalyticsRepository,
    middleware::rbac,
    models::{
        analytics::{AnalyticsParams, BrokerKpis, DateRange, Funnel, ProductivitySeries},
        auth::{Actor, Role},
    },
};

#[derive(Clone)]
pub struct AnalyticsService {
    repo: AnalyticsRepository,
}

impl AnalyticsService {
    pub fn new(repo: AnalyticsRepository) -> Self {
        Self { repo }
    }

    pub async fn broker_kpis(&self, actor: &Actor) -> Result<BrokerKpis, AppError> {
        self.repo.broker_kpis(rbac::visibility_scope(actor)).await
    }

    pub async fn productivity(&self, actor: &Actor, params: &AnalyticsParams) -> Result<ProductivitySeries, AppError> {
        let range = DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;
        let series = self.repo.productivity(&range, broker_scope(actor, params)).await?;
        Ok(ProductivitySeries { series })
    }

    pub async fn funnel(&self, actor: &Actor, params: &AnalyticsParams) -> Result<Funnel, AppError> {
        let range = DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;
        let stages = self.repo.funnel(&range, broker_scope(actor, params)).await?;
        Ok(Funnel { stages })
    }
}

// BROKER sempre vê só os próprios números; os demais podem filtrar por brokerId
fn broker_scope(actor: &Actor, params: &AnalyticsParams) -> Option<Uuid> {
    match actor.role {
        Role::Broker => Some(actor.user_id),
        Role::Manager | Role::Admin => params.broker_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_cannot_peek_at_other_brokers() {
        let me = Uuid::new_v4();
        let params = AnalyticsParams {
            broker_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(broker_scope(&Actor { user_id: me, role: Role::Broker }, &params), Some(me));
    }

    #[test]
    fn managers_may_filter_by_broker() {
        let broker = Uuid::new_v4();
        let manager = Actor { user_id: Uuid::new_v4(), role: Role::Manager };

        let params = AnalyticsParams { broker_id: Some(broker), ..Default::default() };
        assert_eq!(broker_scope(&manager, &params), Some(broker));
        assert_eq!(broker_scope(&manager, &AnalyticsParams::default()), None);
    }
}
