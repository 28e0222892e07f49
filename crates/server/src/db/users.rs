use async_trait::async_trait;
use deadpool_postgres::Pool;
use oml_core::{NewUser, Role, User, UserChanges, UserFilter};
use tokio_postgres::Row;

use super::repository::UserRepository;
use super::search_pattern;
use crate::error::AppError;

const COLUMNS: &str = "id, username, email, password, role, active, created_at, updated_at";

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn from_row(row: &Row) -> User {
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password"),
        role: role.parse().unwrap_or(Role::User),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const FILTER: &str = "($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1) \
                      AND ($2::text IS NULL OR role = $2) \
                      AND ($3::bool IS NULL OR active = $3)";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, i64), AppError> {
        let client = self.pool.get().await?;
        let pattern = search_pattern(filter.search.as_deref());
        let role = filter.role.map(|r| r.as_str());

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM users WHERE {}", FILTER),
                &[&pattern, &role, &filter.active],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM users WHERE {} ORDER BY id ASC LIMIT $4 OFFSET $5",
                    COLUMNS, FILTER
                ),
                &[
                    &pattern,
                    &role,
                    &filter.active,
                    &filter.page.limit(),
                    &filter.page.offset(),
                ],
            )
            .await?;

        Ok((rows.iter().map(from_row).collect(), total))
    }

    async fn find(&self, id: i64) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE id = $1", COLUMNS),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(from_row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM users WHERE email = $1", COLUMNS),
                &[&email],
            )
            .await?;
        Ok(row.as_ref().map(from_row))
    }

    async fn create(&self, user: &NewUser) -> Result<User, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO users (username, email, password, role, active) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING {}",
                    COLUMNS
                ),
                &[
                    &user.username,
                    &user.email,
                    &user.password_hash,
                    &user.role.as_str(),
                    &user.active,
                ],
            )
            .await?;
        Ok(from_row(&row))
    }

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError> {
        let client = self.pool.get().await?;
        let role = changes.role.map(|r| r.as_str());
        let row = client
            .query_opt(
                &format!(
                    "UPDATE users SET \
                        username = COALESCE($2, username), \
                        email = COALESCE($3, email), \
                        password = COALESCE($4, password), \
                        role = COALESCE($5, role), \
                        active = COALESCE($6, active), \
                        updated_at = NOW() \
                     WHERE id = $1 RETURNING {}",
                    COLUMNS
                ),
                &[
                    &id,
                    &changes.username,
                    &changes.email,
                    &changes.password_hash,
                    &role,
                    &changes.active,
                ],
            )
            .await?;
        Ok(row.as_ref().map(from_row))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    async fn count_by_role(&self, role: Role) -> Result<i64, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM users WHERE role = $1",
                &[&role.as_str()],
            )
            .await?;
        Ok(row.get(0))
    }
}
