use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pagination::PageRequest;
use crate::snapshot::Snapshot;

/// A customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Attributes recorded in the audit trail
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("email", self.email.as_str())
            .with("phone", self.phone.as_str())
            .with("address", self.address.as_str())
    }
}

/// Body of a create or full update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl CustomerInput {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation("name is required".into()));
        }
        validate_email(&self.email)
    }
}

/// Body of a partial update; absent fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CustomerPatch {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CoreError::Validation("name cannot be empty".into()));
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

impl From<CustomerInput> for CustomerPatch {
    fn from(input: CustomerInput) -> Self {
        Self {
            name: Some(input.name),
            email: Some(input.email),
            phone: Some(input.phone),
            address: Some(input.address),
        }
    }
}

/// Listing filter: case-insensitive match on name or email
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub page: PageRequest,
}

/// Minimal shape check: one `@` with text on both sides
pub(crate) fn validate_email(email: &str) -> Result<(), CoreError> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(CoreError::Validation(format!("invalid email: '{}'", email))),
    }
}
