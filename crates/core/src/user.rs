use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::customer::validate_email;
use crate::error::CoreError;
use crate::pagination::PageRequest;
use crate::snapshot::Snapshot;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(CoreError::UnknownRole(s.to_string())),
        }
    }
}

/// A stored user. Never serialized directly; see [`UserResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Attributes recorded in the audit trail
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new()
            .with("id", self.id)
            .with("username", self.username.as_str())
            .with("email", self.email.as_str())
            .with("role", self.role.as_str())
            .with("active", self.active)
    }

    pub fn response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public view of a user, without the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user ready to be inserted; the password is already hashed
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
}

/// Changes applied by an update; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_credentials(&self.username, &self.email, Some(&self.password))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_credentials(&self.username, &self.email, self.password.as_deref())
    }
}

/// Listing filter for users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub page: PageRequest,
}

/// Username and email are required; a password, when given, must not be empty
pub fn validate_credentials(
    username: &str,
    email: &str,
    password: Option<&str>,
) -> Result<(), CoreError> {
    if username.trim().is_empty() {
        return Err(CoreError::Validation("username is required".into()));
    }
    if username.chars().count() > 50 {
        return Err(CoreError::Validation(
            "username must be at most 50 characters".into(),
        ));
    }
    validate_email(email)?;
    if password.is_some_and(str::is_empty) {
        return Err(CoreError::Validation("password is required".into()));
    }
    Ok(())
}
