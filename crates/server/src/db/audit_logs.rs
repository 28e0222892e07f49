use async_trait::async_trait;
use deadpool_postgres::Pool;
use oml_core::{ActionType, AuditLog, AuditLogFilter, EntityType, NewAuditLog};
use tokio_postgres::Row;

use super::repository::AuditRepository;
use crate::error::AppError;

const COLUMNS: &str = "id, user_id, username, action_type, entity_type, entity_id, \
                       description, old_data, new_data, status_code, created_at";

const FILTER: &str = "($1::bigint IS NULL OR user_id = $1) \
                      AND ($2::text IS NULL OR action_type = $2) \
                      AND ($3::text IS NULL OR entity_type = $3) \
                      AND ($4::timestamptz IS NULL OR created_at >= $4) \
                      AND ($5::timestamptz IS NULL OR created_at <= $5)";

/// PostgreSQL-backed audit log store
#[derive(Clone)]
pub struct PgAuditRepository {
    pool: Pool,
}

impl PgAuditRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn from_row(row: &Row) -> AuditLog {
    let action: String = row.get("action_type");
    let entity: String = row.get("entity_type");
    let status: i32 = row.get("status_code");
    AuditLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        action_type: action.parse().unwrap_or(ActionType::Other),
        entity_type: entity.parse().unwrap_or(EntityType::Unknown),
        entity_id: row.get("entity_id"),
        description: row.get("description"),
        old_data: row.get("old_data"),
        new_data: row.get("new_data"),
        status_code: u16::try_from(status).unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn append(&self, log: &NewAuditLog) -> Result<AuditLog, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO audit_logs (user_id, username, action_type, entity_type, entity_id, \
                                         description, old_data, new_data, status_code, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
                &[
                    &log.user_id,
                    &log.username,
                    &log.action_type.as_str(),
                    &log.entity_type.as_str(),
                    &log.entity_id,
                    &log.description,
                    &log.old_data,
                    &log.new_data,
                    &i32::from(log.status_code),
                    &log.created_at,
                ],
            )
            .await?;
        Ok(log.clone().into_stored(row.get(0)))
    }

    async fn list(&self, filter: &AuditLogFilter) -> Result<(Vec<AuditLog>, i64), AppError> {
        let client = self.pool.get().await?;
        let action = filter.action_type.map(|a| a.as_str());
        let entity = filter.entity_type.map(|e| e.as_str());

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM audit_logs WHERE {}", FILTER),
                &[
                    &filter.user_id,
                    &action,
                    &entity,
                    &filter.start_date,
                    &filter.end_date,
                ],
            )
            .await?
            .get(0);

        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM audit_logs WHERE {} \
                     ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7",
                    COLUMNS, FILTER
                ),
                &[
                    &filter.user_id,
                    &action,
                    &entity,
                    &filter.start_date,
                    &filter.end_date,
                    &filter.page.limit(),
                    &filter.page.offset(),
                ],
            )
            .await?;

        Ok((rows.iter().map(from_row).collect(), total))
    }
}
