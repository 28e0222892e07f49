//! Bearer token authentication and role gating

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{AuthUser, TokenService};
use crate::error::AppError;

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(request: &Request<Body>) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authorization header is required".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authorization header must be 'Bearer <token>'".to_string())
        })
}

/// Middleware that validates the access token and attaches the caller's
/// [`AuthUser`] to the request
pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let claims = match bearer_token(&request).and_then(|token| tokens.validate(token)) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "Rejected unauthenticated request");
            return e.into_response();
        }
    };

    request.extensions_mut().insert(AuthUser::from(claims));
    next.run(request).await
}

/// Middleware that only lets administrators through
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => next.run(request).await,
        Some(user) => {
            tracing::warn!(
                user_id = user.user_id,
                username = %user.username,
                path = %request.uri().path(),
                "Admin access denied"
            );
            AppError::Forbidden("Admin access required".to_string()).into_response()
        }
        None => AppError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}
