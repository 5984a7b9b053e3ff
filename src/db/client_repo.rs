// src/db/client_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::client::{Client, ClientFilter, ClientStatus, FollowUpState},
};

// Campos graváveis de um cliente (insert e update completo)
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,
    pub status: ClientStatus,
    pub observations: Option<String>,
    pub product: Option<String>,
    pub property_value: Option<Decimal>,
    pub follow_up_state: FollowUpState,
}

impl From<&Client> for ClientRecord {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            source: client.source.clone(),
            status: client.status,
            observations: client.observations.clone(),
            product: client.product.clone(),
            property_value: client.property_value,
            follow_up_state: client.follow_up_state,
        }
    }
}

// Escapa curingas do ILIKE para a busca livre ser literal
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        record: &ClientRecord,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                id, name, phone, email, source, status, observations,
                product, property_value, follow_up_state, owner_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.name)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.source)
        .bind(record.status.as_str())
        .bind(&record.observations)
        .bind(&record.product)
        .bind(record.property_value)
        .bind(record.follow_up_state.as_str())
        .bind(owner_id)
        .fetch_one(executor)
        .await?;

        Ok(client)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(client)
    }

    // Última escrita vence: não há controle de concorrência por linha
    pub async fn update<'e, E>(&self, executor: E, id: Uuid, record: &ClientRecord) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
               SET name = $2,
                   phone = $3,
                   email = $4,
                   source = $5,
                   status = $6,
                   observations = $7,
                   product = $8,
                   property_value = $9,
                   follow_up_state = $10,
                   updated_at = NOW()
             WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&record.name)
        .bind(&record.phone)
        .bind(&record.email)
        .bind(&record.source)
        .bind(record.status.as_str())
        .bind(&record.observations)
        .bind(&record.product)
        .bind(record.property_value)
        .bind(record.follow_up_state.as_str())
        .fetch_one(executor)
        .await?;

        Ok(client)
    }

    // Usado pelo log de interações: só status e follow-up
    pub async fn update_state<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ClientStatus,
        follow_up_state: FollowUpState,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE clients
               SET status = $2, follow_up_state = $3, updated_at = NOW()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(follow_up_state.as_str())
        .execute(executor)
        .await?;

        Ok(())
    }

    // As interações caem junto (ON DELETE CASCADE)
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Busca com filtros opcionais. `limit = None` devolve tudo (usado no export).
    /// Ordem: atualizados mais recentemente primeiro (nulos por último), depois criação.
    pub async fn search(
        &self,
        filter: &ClientFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT *
            FROM clients
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::text IS NULL
                   OR name ILIKE $2
                   OR phone ILIKE $2
                   OR email ILIKE $2
                   OR source ILIKE $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY updated_at DESC NULLS LAST, created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.query.as_deref().map(like_pattern))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    pub async fn count(&self, filter: &ClientFilter) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM clients
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::text IS NULL
                   OR name ILIKE $2
                   OR phone ILIKE $2
                   OR email ILIKE $2
                   OR source ILIKE $2)
              AND ($3::text IS NULL OR status = $3)
            "#,
        )
        .bind(filter.owner_id)
        .bind(filter.query.as_deref().map(like_pattern))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
