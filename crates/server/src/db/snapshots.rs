use std::sync::Arc;

use async_trait::async_trait;
use oml_core::{EntityType, Snapshot};

use super::repository::{CustomerRepository, SnapshotProvider, UserRepository};
use crate::error::AppError;

/// Snapshot provider backed by the user and customer repositories
#[derive(Clone)]
pub struct EntitySnapshots {
    users: Arc<dyn UserRepository>,
    customers: Arc<dyn CustomerRepository>,
}

impl EntitySnapshots {
    pub fn new(users: Arc<dyn UserRepository>, customers: Arc<dyn CustomerRepository>) -> Self {
        Self { users, customers }
    }
}

#[async_trait]
impl SnapshotProvider for EntitySnapshots {
    async fn fetch_for_audit(
        &self,
        entity: EntityType,
        id: &str,
    ) -> Result<Option<Snapshot>, AppError> {
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };

        match entity {
            EntityType::User => Ok(self.users.find(id).await?.map(|u| u.snapshot())),
            EntityType::Customer => Ok(self.customers.find(id).await?.map(|c| c.snapshot())),
            EntityType::Auth | EntityType::Unknown => Ok(None),
        }
    }
}
