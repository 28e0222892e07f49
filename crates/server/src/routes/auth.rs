//! Login, registration and token refresh

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use oml_core::{NewUser, Role, validate_credentials};
use serde::Deserialize;

use super::ApiJson;
use crate::auth::{AuthUser, hash_if_plaintext, verify_password};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

/// POST /api/auth/login - Exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }
    if !user.active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    Ok(Json(state.tokens.issue(&user)?))
}

/// POST /api/auth/register - Create a regular user account and log it in
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_credentials(&req.username, &req.email, Some(&req.password))?;
    let email = req.email.trim().to_string();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already in use".to_string()));
    }

    let user = state
        .users
        .create(&NewUser {
            username: req.username.trim().to_string(),
            email,
            password_hash: hash_if_plaintext(&req.password, state.password_cost)?,
            role: Role::User,
            active: true,
        })
        .await?;
    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(state.tokens.issue(&user)?)))
}

/// POST /api/auth/refresh - Issue a fresh token for the current user
pub async fn refresh(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find(auth.user_id)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::Unauthorized("Account no longer available".to_string()))?;

    Ok(Json(state.tokens.issue(&user)?))
}
