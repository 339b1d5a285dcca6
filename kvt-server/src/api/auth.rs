//! Login and token validation

use axum::extract::{Query, State};
use axum::Json;
use kvt_common::models::{Token, User};
use kvt_common::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::AppContext;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// POST /api/v1/login
///
/// Unknown users and wrong passwords both fail with 401.
pub async fn login(
    State(ctx): State<AppContext>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = match ctx.store.get_user_from_name(&request.username).await {
        Ok(user) => user,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::Auth("invalid username or password".to_string()).into())
        }
        Err(e) => return Err(e.into()),
    };

    let passwords = Arc::clone(&ctx.passwords);
    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || passwords.verify(&request.password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("password check failed: {}", e)))?;

    if !verified {
        tracing::info!(user = %user.name, "Login rejected");
        return Err(Error::Auth("invalid username or password".to_string()).into());
    }

    let token = ctx.store.login_user(&user).await?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(LoginResponse { token }))
}

/// GET /api/v1/validate?token=
pub async fn validate(
    State(ctx): State<AppContext>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<ValidateResponse>> {
    let valid = ctx.store.is_valid_token(&query.token).await?;
    Ok(Json(ValidateResponse { valid }))
}

/// Resolve a token to its user; unknown or expired tokens are 401
pub async fn user_from_token(ctx: &AppContext, token: &str) -> ApiResult<User> {
    match ctx.store.get_user_by_token(token).await {
        Ok(user) => Ok(user),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ApiError::Unauthorized("invalid or expired token".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
