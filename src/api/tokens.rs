// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token endpoints.

use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap,
    },
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{classify, AdminOnly, Auth, AuthFailure, AuthorizationError, Claims, Identity};
use crate::error::ApiError;
use crate::state::AppState;

/// Cookie carrying a token for `POST /v1/auth/verify`.
pub const TOKEN_COOKIE: &str = "token";

/// Response for GET /v1/auth/profile
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub claims: Claims,
    pub identity: Identity,
}

/// Request body for POST /v1/auth/login
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for POST /v1/auth/token
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueTokenRequest {
    /// Identity to issue the token for
    pub user_id: String,
    /// Lifetime in seconds (at most 30 days); the configured default when omitted
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// Issued token, for login and admin issuing.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

impl TokenResponse {
    fn bearer(access_token: String, ttl: Duration) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: ttl.as_secs(),
        }
    }
}

fn token_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value)
}

fn set_token_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        ttl.as_secs()
    )
}

/// Exchange email and password for a token.
///
/// The token is returned in the body and set as the `token` cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Unknown email or wrong password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = state
        .identities
        .find_credentials_by_email(&request.email)
        .await?;
    let identity = match credentials {
        Some(credentials) if credentials.password.verify(&request.password) => {
            credentials.identity
        }
        _ => return Err(classify(AuthFailure::InvalidCredentials(request.email)).into()),
    };

    let ttl = state.codec().default_ttl();
    let token = state.codec().issue(&identity.id, ttl)?;
    tracing::info!(subject_id = %identity.id, "login succeeded");

    Ok((
        AppendHeaders([(SET_COOKIE, set_token_cookie(&token, ttl))]),
        Json(TokenResponse::bearer(token, ttl)),
    ))
}

/// Verify the token held in the `token` cookie and return its claims.
///
/// Only the token is checked; the identity behind it is not resolved.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = Claims),
        (status = 401, description = "Missing, invalid or expired token"),
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Claims>, AuthorizationError> {
    let token = token_cookie(&headers).ok_or_else(|| classify(AuthFailure::MissingCredentials))?;
    let claims = state
        .codec()
        .verify(token)
        .map_err(|e| classify(AuthFailure::Token(e)))?;
    Ok(Json(claims))
}

/// Get the verified claims and identity of the caller.
#[utoipa::path(
    get,
    path = "/v1/auth/profile",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn profile(Auth(ctx): Auth) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        claims: ctx.claims().clone(),
        identity: ctx.identity().clone(),
    })
}

/// Issue a token for an active identity (admin only).
#[utoipa::path(
    post,
    path = "/v1/auth/token",
    tag = "Auth",
    security(("bearer" = [])),
    request_body = IssueTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "ttl is zero or longer than 30 days"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No active identity with this id"),
    )
)]
pub async fn issue_token(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<IssueTokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let identity = state
        .identities
        .find_active_by_id(&request.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let ttl = request
        .ttl_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| state.codec().default_ttl());
    let token = state.codec().issue(&identity.id, ttl)?;

    tracing::info!(
        issued_by = admin.subject_id(),
        subject_id = %identity.id,
        ttl_secs = ttl.as_secs(),
        "token issued"
    );

    Ok(Json(TokenResponse::bearer(token, ttl)))
}
