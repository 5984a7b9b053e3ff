// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::is_unique_violation,
    models::auth::{Profile, Role, User},
};

const USERS_EMAIL_KEY: &str = "users_email_key";

// O repositório de usuários e perfis (tabelas 'users' e 'profiles')
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu ID (fora de transação)
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.find_by_id_in(&self.pool, id).await
    }

    pub async fn find_by_id_in<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Cria o usuário com o id informado se ele ainda não existir.
    /// Retorna `true` quando a linha foi inserida agora.
    pub async fn insert_if_absent<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .execute(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, USERS_EMAIL_KEY) {
                return AppError::Conflict(format!(
                    "O e-mail '{}' já está vinculado a outra identidade.",
                    email
                ));
            }
            e.into()
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Vincula ao `subject` a conta local com este e-mail que ainda não pertence
    /// a nenhuma identidade externa (criada por seed ou registro).
    ///
    /// `linked_marker` é o hash sentinela das contas do provedor: a linha adotada
    /// passa a usá-lo, então a adoção acontece no máximo uma vez.
    /// Retorna o id antigo quando houve troca.
    pub async fn adopt_unlinked<'e, E>(
        &self,
        executor: E,
        subject: Uuid,
        email: &str,
        linked_marker: &str,
    ) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let previous = sqlx::query_scalar::<_, Uuid>(
            r#"
            WITH local AS (
                SELECT id FROM users
                WHERE email = $2 AND password_hash <> $3
                FOR UPDATE
            )
            UPDATE users u
               SET id = $1, password_hash = $3
              FROM local
             WHERE u.id = local.id
            RETURNING local.id
            "#,
        )
        .bind(subject)
        .bind(email)
        .bind(linked_marker)
        .fetch_optional(executor)
        .await?;

        Ok(previous)
    }

    // owner_id não tem FK; acompanha a troca de id manualmente
    pub async fn reassign_client_owner<'e, E>(&self, executor: E, from: Uuid, to: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE clients SET owner_id = $2 WHERE owner_id = $1")
            .bind(from)
            .bind(to)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    // Cria um novo usuário local (registro feito por um ADMIN)
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, USERS_EMAIL_KEY) {
                return AppError::Conflict("Este e-mail já está em uso.".into());
            }
            e.into()
        })?;

        Ok(user)
    }

    // Seed idempotente do administrador: cria ou reescreve nome/senha/papel.
    // Conta já vinculada ao provedor mantém o sentinela (não volta a ser adotável).
    pub async fn upsert_admin<'e, E>(
        &self,
        executor: E,
        name: &str,
        email: &str,
        password_hash: &str,
        linked_marker: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, 'ADMIN')
            ON CONFLICT (email) DO UPDATE
               SET name = EXCLUDED.name,
                   password_hash = CASE
                       WHEN users.password_hash = $5 THEN users.password_hash
                       ELSE EXCLUDED.password_hash
                   END,
                   role = 'ADMIN'
            RETURNING id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(linked_marker)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    // =========================================================================
    //  PERFIS
    // =========================================================================

    pub async fn find_profile<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Option<Profile>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, user_id, phone_number, address, avatar_url, is_active,
                   metadata, created_at, updated_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }

    // Perfil vazio e ativo; no-op se o usuário já tiver um
    pub async fn insert_profile_if_absent<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO profiles (id, user_id, is_active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
