// src/services/auth.rs

use bcrypt::hash;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::SeedAdmin,
    db::UserRepository,
    models::auth::{Profile, RegisterUserPayload, Role, User},
};

// Usuários provisionados pelo provedor externo não têm senha local.
// Não é um hash bcrypt válido, então nunca casa com nenhuma senha.
pub const EXTERNAL_CREDENTIAL_MARKER: &str = "!external-identity-provider";

const DEFAULT_USER_NAME: &str = "Usuário";

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, pool: PgPool) -> Self {
        Self { user_repo, pool }
    }

    /// Garante que o `sub` do token tenha um usuário e um perfil locais.
    ///
    /// Idempotente: depende da chave primária (`users.id`) e da unicidade de
    /// `profiles.user_id`, então chamadas repetidas não duplicam linhas.
    /// Uma conta local ainda não vinculada com o mesmo e-mail é adotada
    /// (id trocado para o `sub`, papel preservado); uma conta já vinculada a
    /// outro `sub` continua sendo conflito.
    pub async fn resolve_identity(
        &self,
        subject: Uuid,
        email: Option<&str>,
    ) -> Result<(User, Profile), AppError> {
        let email = email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Validation("O token não contém e-mail".into()))?;

        let mut tx = self.pool.begin().await?;

        // Conta local (seed ou registro) com o mesmo e-mail: vincula ao subject
        if self.user_repo.find_by_id_in(&mut *tx, subject).await?.is_none() {
            if let Some(previous) = self
                .user_repo
                .adopt_unlinked(&mut *tx, subject, &email, EXTERNAL_CREDENTIAL_MARKER)
                .await?
            {
                self.user_repo
                    .reassign_client_owner(&mut *tx, previous, subject)
                    .await?;
                tracing::info!("🔗 Conta local {} vinculada ao subject {}", previous, subject);
            }
        }

        let created = self
            .user_repo
            .insert_if_absent(
                &mut *tx,
                subject,
                &name_hint(&email),
                &email,
                EXTERNAL_CREDENTIAL_MARKER,
                Role::Broker,
            )
            .await?;
        if created {
            tracing::info!("👤 Usuário local criado para o subject {}", subject);
        }

        let user = self
            .user_repo
            .find_by_id_in(&mut *tx, subject)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Usuário {} sumiu durante a resolução", subject))?;

        self.user_repo.insert_profile_if_absent(&mut *tx, subject).await?;
        let profile = self
            .user_repo
            .find_profile(&mut *tx, subject)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Perfil de {} sumiu durante a resolução", subject))?;

        tx.commit().await?;

        Ok((user, profile))
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.user_repo.find_by_id(id).await
    }

    // Registro feito por um ADMIN; cria usuário e perfil na mesma transação
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<User, AppError> {
        let email = payload.email.trim().to_lowercase();
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("O nome é obrigatório.".into()));
        }

        let password_hash = hash_password(&payload.password).await?;
        let role = payload.role.unwrap_or(Role::Broker);

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .create_user(&mut *tx, name, &email, &password_hash, role)
            .await?;
        self.user_repo.insert_profile_if_absent(&mut *tx, user.id).await?;
        tx.commit().await?;

        tracing::info!("Usuário {} registrado com papel {}", user.id, user.role.as_str());
        Ok(user)
    }

    // Cria (ou atualiza) o administrador configurado no ambiente
    pub async fn seed_admin(&self, seed: &SeedAdmin) -> Result<User, AppError> {
        let password_hash = hash_password(&seed.password).await?;

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .upsert_admin(&mut *tx, &seed.name, &seed.email, &password_hash, EXTERNAL_CREDENTIAL_MARKER)
            .await?;
        self.user_repo.insert_profile_if_absent(&mut *tx, user.id).await?;
        tx.commit().await?;

        Ok(user)
    }
}

// bcrypt é CPU-bound; roda fora do executor async
async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

// Nome inicial a partir da parte local do e-mail
fn name_hint(email: &str) -> String {
    email
        .split('@')
        .next()
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .unwrap_or(DEFAULT_USER_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_comes_from_email_local_part() {
        assert_eq!(name_hint("joana.silva@imob.com"), "joana.silva");
        assert_eq!(name_hint("@imob.com"), DEFAULT_USER_NAME);
    }

    #[test]
    fn external_marker_never_verifies() {
        assert!(bcrypt::verify("qualquer-coisa", EXTERNAL_CREDENTIAL_MARKER).is_err());
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn resolve_identity_is_idempotent(pool: PgPool) {
        let service = AuthService::new(UserRepository::new(pool.clone()), pool.clone());
        let subject = Uuid::new_v4();

        let (first_user, first_profile) =
            service.resolve_identity(subject, Some("Nova@Imob.com")).await.unwrap();
        let (second_user, second_profile) =
            service.resolve_identity(subject, Some("nova@imob.com")).await.unwrap();

        assert_eq!(first_user.id, subject);
        assert_eq!(first_user.email, "nova@imob.com");
        assert_eq!(first_user.role, Role::Broker);
        assert_eq!(first_user.name, "nova");
        assert_eq!(first_user.id, second_user.id);
        assert_eq!(first_profile.id, second_profile.id);
        assert!(first_profile.is_active);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(subject)
            .fetch_one(&pool)
            .await
            .unwrap();
        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = $1")
            .bind(subject)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((users, profiles), (1, 1));
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn email_owned_by_another_subject_is_a_conflict(pool: PgPool) {
        let service = AuthService::new(UserRepository::new(pool.clone()), pool);

        service.resolve_identity(Uuid::new_v4(), Some("dup@imob.com")).await.unwrap();
        let second = service.resolve_identity(Uuid::new_v4(), Some("dup@imob.com")).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn seed_admin_is_idempotent(pool: PgPool) {
        let service = AuthService::new(UserRepository::new(pool.clone()), pool);
        let seed = SeedAdmin {
            name: "Admin".into(),
            email: "admin@imob.com".into(),
            password: "senha-forte-123".into(),
        };

        let first = service.seed_admin(&seed).await.unwrap();
        let second = service.seed_admin(&seed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Admin);
        assert!(bcrypt::verify("senha-forte-123", &second.password_hash).unwrap());
    }

    #[sqlx::test]
    #[ignore = "requer PostgreSQL (DATABASE_URL)"]
    async fn seeded_admin_is_linked_on_first_provider_login(pool: PgPool) {
        let service = AuthService::new(UserRepository::new(pool.clone()), pool.clone());
        let seed = SeedAdmin {
            name: "Admin".into(),
            email: "admin@imob.com".into(),
            password: "senha-forte-123".into(),
        };
        let seeded = service.seed_admin(&seed).await.unwrap();

        let owner_before = seeded.id;
        let client_id = Uuid::new_v4();
        sqlx::query("INSERT INTO clients (id, name, phone, owner_id) VALUES ($1, 'Ana', '85', $2)")
            .bind(client_id)
            .bind(owner_before)
            .execute(&pool)
            .await
            .unwrap();

        let subject = Uuid::new_v4();
        let (user, profile) = service
            .resolve_identity(subject, Some("Admin@Imob.com"))
            .await
            .unwrap();

        assert_eq!(user.id, subject);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name, "Admin");
        assert_eq!(user.password_hash, EXTERNAL_CREDENTIAL_MARKER);
        assert_eq!(profile.user_id, subject);

        let owner: Option<Uuid> = sqlx::query_scalar("SELECT owner_id FROM clients WHERE id = $1")
            .bind(client_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(owner, Some(subject));
        assert!(service.find_user(owner_before).await.unwrap().is_none());

        // Já vinculada: outro subject com o mesmo e-mail é conflito
        let other = service.resolve_identity(Uuid::new_v4(), Some("admin@imob.com")).await;
        assert!(matches!(other, Err(AppError::Conflict(_))));

        // Novo seed não desfaz o vínculo
        let reseeded = service.seed_admin(&seed).await.unwrap();
        assert_eq!(reseeded.id, subject);
        assert_eq!(reseeded.password_hash, EXTERNAL_CREDENTIAL_MARKER);

        // E o mesmo subject continua idempotente
        let (again, _) = service.resolve_identity(subject, Some("admin@imob.com")).await.unwrap();
        assert_eq!(again.id, subject);
    }
}
