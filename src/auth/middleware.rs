// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization middleware for Axum.
//!
//! Every request to a guarded router goes through [`Authorizer::authorize`]:
//!
//! 1. Public route (per [`PolicyRegistry`]) → pass through, nothing attached
//! 2. Extract `Authorization: Bearer <token>`
//! 3. Verify the token ([`TokenCodec::verify`])
//! 4. Resolve the subject to an active identity ([`IdentityStore`])
//! 5. Attach an [`AuthenticatedContext`] to the request extensions
//!
//! Any failure rejects the request through [`classify`]. Callers see the
//! same 401 body whichever step failed.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/v1/auth/profile", get(profile))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         authorizer.clone(),
//!         require_auth,
//!     ));
//! ```
//!
//! The layer must be added with `route_layer` so that `MatchedPath` is
//! available when it runs.

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims::AuthenticatedContext;
use super::error::{classify, AuthFailure, AuthorizationError};
use super::identity::IdentityStore;
use super::policy::{PolicyRegistry, RouteKey};
use super::token::TokenCodec;

/// Successful outcome of [`Authorizer::authorize`].
#[derive(Debug)]
pub enum Authorization {
    /// Route is public; no identity is attached
    Public,
    Authenticated(AuthenticatedContext),
}

/// Shared, read-only authorization dependencies.
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Authorizer {
    codec: Arc<TokenCodec>,
    policy: Arc<PolicyRegistry>,
    identities: Arc<dyn IdentityStore>,
}

impl Authorizer {
    pub fn new(
        codec: Arc<TokenCodec>,
        policy: Arc<PolicyRegistry>,
        identities: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            codec,
            policy,
            identities,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn policy(&self) -> &PolicyRegistry {
        &self.policy
    }

    /// Decide whether a request to `route` carrying `headers` may proceed.
    ///
    /// `route` is `None` when the request did not match a registered route;
    /// such requests always require authentication.
    pub async fn authorize(
        &self,
        route: Option<&RouteKey>,
        headers: &HeaderMap,
    ) -> Result<Authorization, AuthorizationError> {
        if route.is_some_and(|r| self.policy.is_public(r)) {
            return Ok(Authorization::Public);
        }

        self.authenticate(headers)
            .await
            .map(Authorization::Authenticated)
            .map_err(classify)
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedContext, AuthFailure> {
        let token = extract_bearer(headers)?;
        let claims = self.codec.verify(token)?;

        let identity = self
            .identities
            .find_active_by_id(claims.subject_id())
            .await?
            .filter(|identity| identity.is_active && identity.id == claims.subject_id())
            .ok_or_else(|| AuthFailure::IdentityNotFound(claims.subject_id().to_string()))?;

        tracing::debug!(subject_id = claims.subject_id(), "request authenticated");
        Ok(AuthenticatedContext::new(claims, identity))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme must be exactly `Bearer` followed by a single space and a
/// non-empty token without further whitespace.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthFailure::InvalidScheme("header is not visible ASCII".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AuthFailure::InvalidScheme("no credential after scheme".to_string()))?;

    if scheme != "Bearer" {
        return Err(AuthFailure::InvalidScheme(format!("scheme {scheme:?}")));
    }
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthFailure::InvalidScheme("bearer token is empty or split".to_string()));
    }

    Ok(token)
}

/// Axum middleware running [`Authorizer::authorize`] for each request.
///
/// The context is inserted only after authorization completes, so a
/// request dropped mid-lookup never carries one.
pub async fn require_auth(
    State(authorizer): State<Authorizer>,
    mut request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| RouteKey::new(request.method().clone(), path.as_str()));

    match authorizer.authorize(route.as_ref(), request.headers()).await {
        Ok(Authorization::Public) => next.run(request).await,
        Ok(Authorization::Authenticated(context)) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
