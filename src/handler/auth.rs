use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::{issue_token, ADMIN_ROLE};
use crate::database::AppState;
use crate::error::{AppError, AppResult};

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct AdminUser {
    pub email: String,
    pub role: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    /// Token expiry, unix seconds
    pub expires_at: i64,
    pub user: AdminUser,
}

/// Exchanges the admin credentials for a bearer token
///
/// # Response
///
/// - **200 OK** - `{ success, message, token, expiresAt, user }`
/// - **400 Bad Request** - body is not JSON
/// - **401 Unauthorized** - credentials do not match the configured admin
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let config = &state.config;

    let email = request.email.trim();
    if !email.eq_ignore_ascii_case(&config.admin_login_email) || request.password != config.admin_password {
        tracing::warn!(email, "Failed admin login");
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let (token, claims) = issue_token(
        &config.admin_login_email,
        &config.jwt_secret,
        Duration::hours(config.token_ttl_hours),
    )
    .map_err(|err| AppError::Internal(format!("failed to sign token: {}", err)))?;

    tracing::info!(email = %claims.sub, "Admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        token,
        expires_at: claims.exp,
        user: AdminUser {
            email: claims.sub,
            role: ADMIN_ROLE,
        },
    }))
}
