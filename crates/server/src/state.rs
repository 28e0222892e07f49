//! Shared application state

use std::sync::Arc;

use deadpool_postgres::Pool;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::{
    AuditRepository, CustomerRepository, EntitySnapshots, HealthCheck, PgAuditRepository,
    PgCustomerRepository, PgHealth, PgUserRepository, SnapshotProvider, UserRepository,
};

/// Handles shared by every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub audit_logs: Arc<dyn AuditRepository>,
    pub health: Arc<dyn HealthCheck>,
    pub tokens: TokenService,
    /// bcrypt cost applied when hashing passwords
    pub password_cost: u32,
}

impl AppState {
    /// State backed by PostgreSQL repositories sharing one pool
    pub fn postgres(pool: Pool, config: &Config) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            customers: Arc::new(PgCustomerRepository::new(pool.clone())),
            audit_logs: Arc::new(PgAuditRepository::new(pool.clone())),
            health: Arc::new(PgHealth::new(pool)),
            tokens: TokenService::new(&config.jwt_secret, config.jwt_expiration_hours),
            password_cost: config.bcrypt_cost,
        }
    }

    /// Snapshot provider over this state's repositories
    pub fn snapshots(&self) -> Arc<dyn SnapshotProvider> {
        Arc::new(EntitySnapshots::new(self.users.clone(), self.customers.clone()))
    }
}
