// src/db/interaction_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::interaction::Interaction};

// Campos de uma nova interação. Não existe update: o log é append-only.
#[derive(Debug, Clone)]
pub struct NewInteraction<'a> {
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub kind: &'a str,
    pub observation: Option<&'a str>,
    pub from_status: Option<&'a str>,
    pub to_status: Option<&'a str>,
}

#[derive(Clone)]
pub struct InteractionRepository {
    pool: PgPool,
}

impl InteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, new: &NewInteraction<'_>) -> Result<Interaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let interaction = sqlx::query_as::<_, Interaction>(
            r#"
            INSERT INTO interactions (id, client_id, user_id, type, observation, from_status, to_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, client_id, user_id, type, observation, from_status, to_status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.client_id)
        .bind(new.user_id)
        .bind(new.kind)
        .bind(new.observation)
        .bind(new.from_status)
        .bind(new.to_status)
        .fetch_one(executor)
        .await?;

        Ok(interaction)
    }

    // Mais recentes primeiro
    pub async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Interaction>, AppError> {
        let items = sqlx::query_as::<_, Interaction>(
            r#"
            SELECT id, client_id, user_id, type, observation, from_status, to_status, created_at
            FROM interactions
            WHERE client_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
