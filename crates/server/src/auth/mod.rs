//! Authentication: JWT tokens, password hashing and the request identity

pub mod jwt;
pub mod password;

use axum::{extract::FromRequestParts, http::request::Parts};
use oml_core::{Actor, Role};

use crate::error::AppError;

pub use jwt::{Claims, TokenResponse, TokenService};
pub use password::{
    MAX_BCRYPT_COST, MIN_BCRYPT_COST, hash_if_plaintext, is_hashed, verify_password,
};

/// Identity of an authenticated request, inserted into the request
/// extensions by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.username.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}
