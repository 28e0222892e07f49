//! Storage seams used by the handlers and the audit pipeline

use async_trait::async_trait;
use oml_core::{
    AuditLog, AuditLogFilter, Customer, CustomerFilter, CustomerInput, CustomerPatch,
    EntityType, NewAuditLog, NewUser, Role, Snapshot, User, UserChanges, UserFilter,
};

use crate::error::AppError;

/// Customer CRUD
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// One page of customers ordered by name, plus the total match count
    async fn list(&self, filter: &CustomerFilter) -> Result<(Vec<Customer>, i64), AppError>;

    async fn find(&self, id: i64) -> Result<Option<Customer>, AppError>;

    async fn create(&self, input: &CustomerInput) -> Result<Customer, AppError>;

    /// Apply the present fields; `None` when the customer does not exist
    async fn update(&self, id: i64, patch: &CustomerPatch) -> Result<Option<Customer>, AppError>;

    /// `false` when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

/// User CRUD
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, i64), AppError>;

    async fn find(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn create(&self, user: &NewUser) -> Result<User, AppError>;

    async fn update(&self, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError>;

    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    async fn count_by_role(&self, role: Role) -> Result<i64, AppError>;
}

/// Append-only audit log store
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, log: &NewAuditLog) -> Result<AuditLog, AppError>;

    /// One page of records, newest first, plus the total match count
    async fn list(&self, filter: &AuditLogFilter) -> Result<(Vec<AuditLog>, i64), AppError>;
}

/// Database liveness probe for `/health`
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}

/// Current persisted state of an entity, for pre-mutation audit snapshots
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// `Ok(None)` when the entity type has no snapshot or the entity is gone
    async fn fetch_for_audit(
        &self,
        entity: EntityType,
        id: &str,
    ) -> Result<Option<Snapshot>, AppError>;
}
