// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization errors.
//!
//! Failures inside the authorization path are [`AuthFailure`] values that
//! carry whatever detail caused them. They leave the path only through
//! [`classify`], which logs that detail once and turns it into an
//! [`AuthorizationError`]: a kind, a reason, and a stable message. Nothing
//! else from the original failure survives.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::identity::IdentityStoreError;
use super::roles::Role;
use super::token::TokenError;

/// A failure inside the authorization path, with internal detail.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    /// No authorization header present
    #[error("authorization header is missing")]
    MissingCredentials,
    /// Header present but not `Bearer <token>`
    #[error("authorization header is not a bearer credential: {0}")]
    InvalidScheme(String),
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("no active identity for subject {0}")]
    IdentityNotFound(String),
    /// Login with an unknown email or a wrong password
    #[error("login rejected for {0}")]
    InvalidCredentials(String),
    #[error("identity lookup failed: {0}")]
    Store(#[from] IdentityStoreError),
    #[error("role {actual} lacks privilege {required}")]
    InsufficientRole { actual: Role, required: Role },
    /// A bare message from outside the typed taxonomy
    #[error("{0}")]
    Unclassified(String),
}

impl AuthFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            AuthFailure::MissingCredentials | AuthFailure::InvalidScheme(_) => {
                FailureReason::MalformedRequest
            }
            AuthFailure::Token(_) => FailureReason::InvalidToken,
            AuthFailure::IdentityNotFound(_) => FailureReason::IdentityNotFound,
            AuthFailure::InvalidCredentials(_) => FailureReason::InvalidCredentials,
            AuthFailure::Store(_) => FailureReason::InternalFault,
            AuthFailure::InsufficientRole { .. } => FailureReason::InsufficientRole,
            AuthFailure::Unclassified(_) => FailureReason::Unclassified,
        }
    }
}

/// Why a request was rejected. Never serialized into a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Missing credential header or wrong scheme
    MalformedRequest,
    /// Bad signature, malformed claims or expired
    InvalidToken,
    /// Subject does not resolve to an active identity
    IdentityNotFound,
    /// Login email or password did not match
    InvalidCredentials,
    /// Authenticated but lacking the required role
    InsufficientRole,
    /// Unexpected collaborator failure
    InternalFault,
    /// Anything not classified above
    Unclassified,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MalformedRequest => "malformed_request",
            FailureReason::InvalidToken => "invalid_token",
            FailureReason::IdentityNotFound => "identity_not_found",
            FailureReason::InvalidCredentials => "invalid_credentials",
            FailureReason::InsufficientRole => "insufficient_role",
            FailureReason::InternalFault => "internal_fault",
            FailureReason::Unclassified => "unclassified",
        }
    }

    /// Outward kind. Only explicitly classified reasons escape `Unauthorized`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FailureReason::InsufficientRole => ErrorKind::Forbidden,
            FailureReason::InternalFault => ErrorKind::Internal,
            FailureReason::MalformedRequest
            | FailureReason::InvalidToken
            | FailureReason::IdentityNotFound
            | FailureReason::InvalidCredentials
            | FailureReason::Unclassified => ErrorKind::Unauthorized,
        }
    }
}

/// The outward classification of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized!",
            ErrorKind::Forbidden => "Insufficient permissions for this operation",
            ErrorKind::Internal => "Internal authentication error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A classified authorization failure.
///
/// Only [`classify`] builds one, so every instance has been logged and
/// stripped of internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationError {
    kind: ErrorKind,
    reason: FailureReason,
}

impl AuthorizationError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Internal reason, for logs and tests. Not part of the response.
    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    pub fn message(&self) -> &'static str {
        self.kind.message()
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

/// Classify a failure, logging its detail. The detail is dropped here.
pub fn classify(failure: AuthFailure) -> AuthorizationError {
    let reason = failure.reason();
    let kind = reason.kind();
    match kind {
        ErrorKind::Internal => {
            tracing::error!(reason = reason.as_str(), detail = %failure, "authorization failed")
        }
        ErrorKind::Unauthorized | ErrorKind::Forbidden => {
            tracing::warn!(reason = reason.as_str(), detail = %failure, "authorization rejected")
        }
    }
    AuthorizationError { kind, reason }
}

/// Classify a bare message. Always unauthorized.
pub fn classify_raw(message: impl fmt::Display) -> AuthorizationError {
    classify(AuthFailure::Unclassified(message.to_string()))
}

impl From<AuthFailure> for AuthorizationError {
    fn from(failure: AuthFailure) -> Self {
        classify(failure)
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthorizationError {}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    error_code: &'static str,
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: self.message(),
            error_code: self.kind.error_code(),
        });
        (self.status_code(), body).into_response()
    }
}
