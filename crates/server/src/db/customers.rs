use async_trait::async_trait;
use deadpool_postgres::Pool;
use oml_core::{Customer, CustomerFilter, CustomerInput, CustomerPatch};
use tokio_postgres::Row;

use super::repository::CustomerRepository;
use super::search_pattern;
use crate::error::AppError;

const COLUMNS: &str = "id, name, email, phone, address, created_at, updated_at";

/// PostgreSQL-backed customer repository
#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: Pool,
}

impl PgCustomerRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn from_row(row: &Row) -> Customer {
    Customer {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        address: row.get("address"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn list(&self, filter: &CustomerFilter) -> Result<(Vec<Customer>, i64), AppError> {
        let client = self.pool.get().await?;
        let pattern = search_pattern(filter.search.as_deref());

        let total: i64 = client
            .query_one(
                "SELECT COUNT(*) FROM customers \
                 WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)",
                &[&pattern],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM customers \
                     WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1) \
                     ORDER BY name ASC, id ASC LIMIT $2 OFFSET $3",
                    COLUMNS
                ),
                &[&pattern, &filter.page.limit(), &filter.page.offset()],
            )
            .await?;

        Ok((rows.iter().map(from_row).collect(), total))
    }

    async fn find(&self, id: i64) -> Result<Option<Customer>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM customers WHERE id = $1", COLUMNS),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(from_row))
    }

    async fn create(&self, input: &CustomerInput) -> Result<Customer, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO customers (name, email, phone, address) \
                     VALUES ($1, $2, $3, $4) RETURNING {}",
                    COLUMNS
                ),
                &[&input.name, &input.email, &input.phone, &input.address],
            )
            .await?;
        Ok(from_row(&row))
    }

    async fn update(&self, id: i64, patch: &CustomerPatch) -> Result<Option<Customer>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE customers SET \
                        name = COALESCE($2, name), \
                        email = COALESCE($3, email), \
                        phone = COALESCE($4, phone), \
                        address = COALESCE($5, address), \
                        updated_at = NOW() \
                     WHERE id = $1 RETURNING {}",
                    COLUMNS
                ),
                &[&id, &patch.name, &patch.email, &patch.phone, &patch.address],
            )
            .await?;
        Ok(row.as_ref().map(from_row))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM customers WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }
}
