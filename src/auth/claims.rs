// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified token claims and the per-request authenticated context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::Identity;
use super::roles::Role;

/// Payload as it travels inside a signed token.
///
/// Only the token codec reads or writes this; everything else sees [`Claims`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenPayload {
    /// Subject (identity id)
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}

/// Claims of a token that passed signature, expiry and subject checks.
///
/// There is no public constructor: a `Claims` value only ever comes out of
/// [`TokenCodec::verify`](super::TokenCodec::verify).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Claims {
    /// Identity id the token was issued for
    subject_id: String,
    /// Issued at (Unix seconds)
    issued_at: i64,
    /// Expires at (Unix seconds)
    expires_at: i64,
}

impl Claims {
    pub(crate) fn from_verified(payload: TokenPayload) -> Self {
        Self {
            subject_id: payload.sub,
            issued_at: payload.iat,
            expires_at: payload.exp,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

/// The verified caller of the current request.
///
/// Inserted into the request extensions by the authorization middleware and
/// dropped with the request. Not `Serialize`: handlers copy out what they
/// return.
#[derive(Debug, Clone)]
pub struct AuthenticatedContext {
    claims: Claims,
    identity: Identity,
}

impl AuthenticatedContext {
    pub(crate) fn new(claims: Claims, identity: Identity) -> Self {
        Self { claims, identity }
    }

    /// Subject id of the verified token.
    pub fn subject_id(&self) -> &str {
        self.claims.subject_id()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    /// Check if the caller has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.identity.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.identity.role == Role::Admin
    }
}
