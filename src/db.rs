pub mod analytics_repo;
pub use analytics_repo::AnalyticsRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod interaction_repo;
pub use interaction_repo::InteractionRepository;
pub mod user_repo;
pub use user_repo::UserRepository;

use sqlx::PgPool;

// Checagem de conectividade usada pelo /health
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

// Verifica se o erro é violação de UNIQUE em uma constraint específica
pub(crate) fn is_unique_violation(error: &sqlx::Error, constraint: &str) -> bool {
    match error {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
