// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated caller.
//!
//! These read the [`AuthenticatedContext`] that [`require_auth`] attached;
//! they never verify tokens themselves.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(ctx): Auth) -> impl IntoResponse {
//!     // ctx.subject_id() is the verified token subject
//! }
//! ```
//!
//! [`require_auth`]: super::middleware::require_auth

use axum::{extract::FromRequestParts, http::request::Parts};

use super::claims::AuthenticatedContext;
use super::error::{classify, classify_raw, AuthFailure, AuthorizationError};
use super::roles::Role;

/// Extractor for authenticated callers.
///
/// Rejects with 401 when no context is attached, which happens on public
/// routes or routes outside the guarded router.
pub struct Auth(pub AuthenticatedContext);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthorizationError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedContext>()
            .cloned()
            .map(Auth)
            .ok_or_else(|| classify_raw("handler requires an authenticated context"))
    }
}

/// Extractor that requires the admin role.
pub struct AdminOnly(pub AuthenticatedContext);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthorizationError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(ctx) = Auth::from_request_parts(parts, state).await?;

        if !ctx.has_role(Role::Admin) {
            return Err(classify(AuthFailure::InsufficientRole {
                actual: ctx.role(),
                required: Role::Admin,
            }));
        }

        Ok(AdminOnly(ctx))
    }
}
