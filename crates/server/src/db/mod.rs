//! PostgreSQL persistence

mod audit_logs;
mod customers;
pub mod repository;
mod schema;
mod snapshots;
mod users;

pub use audit_logs::PgAuditRepository;
pub use customers::PgCustomerRepository;
pub use repository::{
    AuditRepository, CustomerRepository, HealthCheck, SnapshotProvider, UserRepository,
};
pub use schema::migrate;
pub use snapshots::EntitySnapshots;
pub use users::PgUserRepository;

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, Runtime};
use oml_core::{NewUser, Role};
use tokio_postgres::NoTls;

use crate::auth::hash_if_plaintext;
use crate::error::AppError;

/// Create a connection pool from a database URL
pub async fn create_pool(database_url: &str) -> Result<Pool, deadpool_postgres::CreatePoolError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
}

/// `ILIKE` pattern for a free-text search term; blank terms match everything
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

/// Liveness probe that round-trips `SELECT 1`
#[derive(Clone)]
pub struct PgHealth {
    pool: Pool,
}

impl PgHealth {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PgHealth {
    async fn ping(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        client.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}

/// Create the bootstrap administrator when no admin account exists yet.
///
/// Returns `true` when an account was created.
pub async fn ensure_admin_exists(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
    cost: u32,
) -> Result<bool, AppError> {
    if users.count_by_role(Role::Admin).await? > 0 {
        return Ok(false);
    }

    let admin = NewUser {
        username: "admin".to_string(),
        email: email.to_string(),
        password_hash: hash_if_plaintext(password, cost)?,
        role: Role::Admin,
        active: true,
    };
    let created = users.create(&admin).await?;
    tracing::info!(user_id = created.id, email = %created.email, "Created bootstrap admin account");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" acme ")), Some("%acme%".to_string()));
    }
}
