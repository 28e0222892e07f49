//! JWT issuance and validation (HS256)

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use oml_core::{Role, User};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token response returned by login, register and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Signs and validates access tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    /// Issue a fresh access token for a user
    pub fn issue(&self, user: &User) -> Result<TokenResponse, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.lifetime.num_seconds(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        })
    }

    /// Decode and validate a token
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            username: "jdoe".into(),
            email: "j@d.com".into(),
            password_hash: String::new(),
            role: Role::User,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let tokens = TokenService::new("test-secret", 1);
        let response = tokens.issue(&user()).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);

        let claims = tokens.validate(&response.access_token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "jdoe");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issued = TokenService::new("one", 1).issue(&user()).unwrap();
        let err = TokenService::new("two", 1)
            .validate(&issued.access_token)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = TokenService::new("test-secret", 1);
        assert!(tokens.validate("not.a.token").is_err());
    }
}
