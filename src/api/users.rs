// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AdminOnly, Auth, AuthenticatedContext, Identity, Role};
use crate::error::ApiError;
use crate::state::AppState;

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Identity id (token subject)
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&AuthenticatedContext> for UserMeResponse {
    fn from(ctx: &AuthenticatedContext) -> Self {
        let identity = ctx.identity();
        Self {
            user_id: ctx.subject_id().to_string(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
        }
    }
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(ctx): Auth) -> Json<UserMeResponse> {
    Json((&ctx).into())
}

/// Look up an active identity by id (admin only).
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = String, Path, description = "Identity id")),
    responses(
        (status = 200, description = "Identity", body = Identity),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No active identity with this id"),
    )
)]
pub async fn get_user(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Identity>, ApiError> {
    state
        .identities
        .find_active_by_id(&user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User"))
}
