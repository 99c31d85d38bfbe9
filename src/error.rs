// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Handler errors.
//!
//! Authorization rejections keep their classified response. Store and
//! token encoding failures are logged here and answered with a fixed 500
//! message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{AuthorizationError, IdentityStoreError, TokenError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthorizationError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] IdentityStoreError),
    #[error("token issuing failed: {0}")]
    Issue(TokenError),
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::EmptySubject | TokenError::ZeroTtl | TokenError::TtlOutOfRange => {
                ApiError::InvalidInput(e.to_string())
            }
            other => ApiError::Issue(other),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => e.status_code(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Issue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message) = match &self {
            ApiError::Auth(e) => return (*e).into_response(),
            ApiError::NotFound(_) => ("not_found", self.to_string()),
            ApiError::InvalidInput(_) => ("invalid_input", self.to_string()),
            ApiError::Store(e) => {
                tracing::error!(error = %e, "identity store failed");
                ("internal", "Identity lookup failed".to_string())
            }
            ApiError::Issue(e) => {
                tracing::error!(error = %e, "token issuing failed");
                ("internal", "Token issuing failed".to_string())
            }
        };
        let body = Json(ErrorBody {
            error: message,
            error_code,
        });
        (status, body).into_response()
    }
}
