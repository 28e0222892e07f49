//! Audit record types and request classification

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pagination::PageRequest;

/// Kind of action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Read,
    Update,
    Delete,
    Other,
}

impl ActionType {
    /// Map an HTTP method name to an action
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "POST" => ActionType::Create,
            "PUT" | "PATCH" => ActionType::Update,
            "DELETE" => ActionType::Delete,
            "GET" => ActionType::Read,
            _ => ActionType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Read => "read",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
            ActionType::Other => "other",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(ActionType::Create),
            "read" => Ok(ActionType::Read),
            "update" => Ok(ActionType::Update),
            "delete" => Ok(ActionType::Delete),
            "other" => Ok(ActionType::Other),
            _ => Err(CoreError::UnknownAction(s.to_string())),
        }
    }
}

/// Coarse classification of the resource a request touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    User,
    Customer,
    Auth,
    Unknown,
}

impl EntityType {
    /// Map a resource path segment (`users`, `klanten`, ...) to an entity type
    pub fn from_segment(segment: &str) -> Self {
        match segment {
            "users" => EntityType::User,
            "klanten" | "customers" => EntityType::Customer,
            "auth" => EntityType::Auth,
            _ => EntityType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Customer => "customer",
            EntityType::Auth => "auth",
            EntityType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    /// Accepts both the stored names and the resource path names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(EntityType::User),
            "customer" | "customers" | "klanten" => Ok(EntityType::Customer),
            "auth" => Ok(EntityType::Auth),
            "unknown" => Ok(EntityType::Unknown),
            _ => Err(CoreError::UnknownEntity(s.to_string())),
        }
    }
}

/// Identity a request is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub username: String,
}

impl Actor {
    pub const SYSTEM_USERNAME: &'static str = "system";

    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }

    /// Fallback actor for requests without an authenticated identity
    pub fn system() -> Self {
        Self::new(0, Self::SYSTEM_USERNAME)
    }
}

/// What a request does, derived from its method and path.
///
/// The first path segment is the API group (`/api`), the second names the
/// resource and the third, when numeric, is the entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub action: ActionType,
    pub entity: EntityType,
    pub entity_id: String,
}

impl RequestTarget {
    pub fn classify(method: &str, path: &str) -> Self {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).skip(1);

        let entity = segments
            .next()
            .map(EntityType::from_segment)
            .unwrap_or(EntityType::Unknown);

        let entity_id = segments
            .next()
            .filter(|s| s.parse::<u64>().is_ok())
            .map(str::to_string)
            .unwrap_or_default();

        Self {
            action: ActionType::from_method(method),
            entity,
            entity_id,
        }
    }
}

/// A stored audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub action_type: ActionType,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub description: String,
    pub old_data: String,
    pub new_data: String,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
}

/// An audit record that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditLog {
    pub user_id: i64,
    pub username: String,
    pub action_type: ActionType,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub description: String,
    pub old_data: String,
    pub new_data: String,
    pub status_code: u16,
    pub created_at: DateTime<Utc>,
}

impl NewAuditLog {
    /// Attach the store-assigned id
    pub fn into_stored(self, id: i64) -> AuditLog {
        AuditLog {
            id,
            user_id: self.user_id,
            username: self.username,
            action_type: self.action_type,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            description: self.description,
            old_data: self.old_data,
            new_data: self.new_data,
            status_code: self.status_code,
            created_at: self.created_at,
        }
    }
}

/// Filter for reading back audit records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLogFilter {
    pub user_id: Option<i64>,
    pub action_type: Option<ActionType>,
    pub entity_type: Option<EntityType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

impl AuditLogFilter {
    /// Whether a record passes every filter criterion (paging excluded)
    pub fn matches(&self, log: &AuditLog) -> bool {
        self.user_id.is_none_or(|id| log.user_id == id)
            && self.action_type.is_none_or(|a| log.action_type == a)
            && self.entity_type.is_none_or(|e| log.entity_type == e)
            && self.start_date.is_none_or(|start| log.created_at >= start)
            && self.end_date.is_none_or(|end| log.created_at <= end)
    }
}
