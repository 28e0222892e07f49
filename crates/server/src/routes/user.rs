//! User management handlers (admin only)

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use oml_core::{
    CreateUserRequest, NewUser, PageRequest, Paginated, Role, UpdateUserRequest, UserChanges,
    UserFilter, UserResponse,
};
use serde_json::json;

use super::{ApiJson, ApiPath, parse_param};
use crate::auth::hash_if_plaintext;
use crate::error::AppError;
use crate::middleware::AuditTrail;
use crate::state::AppState;

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

fn email_taken() -> AppError {
    AppError::Conflict("Email is already in use".to_string())
}

/// `search` (also `searchTerm`), `role`, `active`, `page`, `pageSize`
fn list_filter(params: &HashMap<String, String>) -> UserFilter {
    let get = |key: &str| params.get(key).map(String::as_str);

    UserFilter {
        search: get("search")
            .or_else(|| get("searchTerm"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        role: parse_param::<Role>(get("role")),
        active: parse_param(get("active")),
        page: PageRequest::new(parse_param(get("page")), parse_param(get("pageSize"))),
    }
}

/// GET /api/users - List users
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = list_filter(&params);
    let (users, total) = state.users.list(&filter).await?;
    let users: Vec<UserResponse> = users.iter().map(|u| u.response()).collect();
    Ok(Json(Paginated::new(users, filter.page, total)))
}

/// GET /api/users/{id} - Read a user
pub async fn read(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.find(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(user.response()))
}

/// POST /api/users - Create a user
pub async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(email_taken());
    }

    let user = NewUser {
        username: req.username.trim().to_string(),
        email: req.email.trim().to_string(),
        password_hash: hash_if_plaintext(&req.password, state.password_cost)?,
        role: req.role.unwrap_or(Role::User),
        active: req.active.unwrap_or(true),
    };
    let created = state.users.create(&user).await?;
    tracing::info!(user_id = created.id, role = %created.role, "User created");

    Ok((StatusCode::CREATED, Json(created.response())))
}

/// PUT /api/users/{id} - Update a user; the password only changes when given
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let existing = state.users.find(id).await?.ok_or_else(|| not_found(id))?;

    let email = req.email.trim().to_string();
    if email != existing.email {
        if let Some(other) = state.users.find_by_email(&email).await? {
            if other.id != id {
                return Err(email_taken());
            }
        }
    }

    let password_hash = match req.password.as_deref() {
        Some(password) => Some(hash_if_plaintext(password, state.password_cost)?),
        None => None,
    };

    let changes = UserChanges {
        username: Some(req.username.trim().to_string()),
        email: Some(email),
        password_hash,
        role: req.role,
        active: req.active,
    };
    let updated = state
        .users
        .update(id, &changes)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(updated.response()))
}

/// DELETE /api/users/{id} - Delete a user and return what was removed
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    trail: AuditTrail,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users.find(id).await?.ok_or_else(|| not_found(id))?;
    let snapshot = user.snapshot();
    trail.publish(snapshot.clone());

    if !state.users.delete(id).await? {
        return Err(not_found(id));
    }
    tracing::info!(user_id = id, "User deleted");

    Ok(Json(json!({
        "message": "User deleted successfully",
        "data": snapshot,
    })))
}
