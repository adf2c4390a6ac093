//! Admin authentication
//!
//! A single admin account is configured through the environment. A
//! successful login yields an HS256-signed bearer token carrying the admin
//! role and an expiry; admin-only handlers take an [`AdminClaims`]
//! argument, which rejects the request with 401 unless such a token is
//! presented.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::AppError;

/// Role carried by every admin token
pub const ADMIN_ROLE: &str = "admin";

/// Claims of an admin bearer token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdminClaims {
    /// Admin email
    pub sub: String,
    pub role: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Signs a token for `email`, valid for `ttl`
pub fn issue_token(
    email: &str,
    secret: &str,
    ttl: Duration,
) -> Result<(String, AdminClaims), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: email.to_string(),
        role: ADMIN_ROLE.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims))
}

/// Checks signature, expiry and role of a bearer token
pub fn verify_token(token: &str, secret: &str) -> Result<AdminClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| {
        tracing::debug!(error = %err, "Rejected bearer token");
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    if data.claims.role != ADMIN_ROLE {
        return Err(AppError::Unauthorized("Admin access required".to_string()));
    }
    Ok(data.claims)
}

impl FromRequestParts<AppState> for AdminClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        verify_token(token, &state.config.jwt_secret)
    }
}
