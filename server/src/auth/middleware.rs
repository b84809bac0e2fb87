//! Authentication middleware.
//!
//! The bearer token names the requesting user. When `AUTH_SECRET` is set the
//! token must be `<user>:<secret>`; otherwise the whole token is the user id
//! and requests without a header run as `anonymous`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// User id given to unauthenticated requests when no secret is configured.
pub const ANONYMOUS: &str = "anonymous";

/// Authenticated user extracted from request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.user_id
    }
}

/// Resolve a user from an optional `Authorization` header value.
pub fn authenticate(header: Option<&str>, secret: Option<&str>) -> Result<AuthUser, AppError> {
    let header = match (header, secret) {
        (Some(header), _) => header,
        (None, None) => {
            return Ok(AuthUser {
                user_id: ANONYMOUS.to_string(),
            })
        }
        (None, Some(_)) => return Err(AppError::Unauthorized("Missing authorization header")),
    };

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized("Invalid authorization header format"))?
        .trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Empty bearer token"));
    }

    let user_id = match secret {
        Some(secret) => match token.rsplit_once(':') {
            Some((user, given)) if given == secret && !user.is_empty() => user,
            _ => return Err(AppError::Unauthorized("Invalid bearer token")),
        },
        None => token,
    };

    Ok(AuthUser {
        user_id: user_id.to_string(),
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let user = authenticate(header, state.config.auth_secret.as_deref())?;
        tracing::trace!(user = %user.user_id, "request authenticated");
        Ok(user)
    }
}
