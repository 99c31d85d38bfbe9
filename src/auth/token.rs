// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token issuing and verification.
//!
//! The only verifier of these tokens is this service, so a shared HMAC
//! secret is used instead of a key pair. Expiry is checked against the
//! injected [`Clock`] with no leeway: a token is valid while `now < exp`.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::claims::{Claims, TokenPayload};
use super::clock::Clock;
use crate::config::AuthSettings;

/// Longest lifetime a token may be issued with (30 days).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Token issuing and verification errors.
///
/// Verification reasons stay distinct here; the middleware collapses them
/// into a single unauthorized outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token subject must not be empty")]
    EmptySubject,
    #[error("token ttl must be at least one second")]
    ZeroTtl,
    #[error("token ttl must not exceed 30 days")]
    TtlOutOfRange,
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Issues and verifies signed tokens with a process-wide secret.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(settings: &AuthSettings, clock: Arc<dyn Clock>) -> Self {
        let secret = settings.secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced below against `clock`, not the library's wall clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            default_ttl: settings.token_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject_id` valid for `ttl` (whole seconds).
    pub fn issue(&self, subject_id: &str, ttl: Duration) -> Result<String, TokenError> {
        if subject_id.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }
        if ttl.as_secs() == 0 {
            return Err(TokenError::ZeroTtl);
        }
        if ttl > MAX_TOKEN_TTL {
            return Err(TokenError::TtlOutOfRange);
        }
        let now = self.clock.now();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or(TokenError::TtlOutOfRange)?;

        let payload = TokenPayload {
            sub: subject_id.to_string(),
            iat: now,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Issue a token with the configured default ttl.
    pub fn issue_default(&self, subject_id: &str) -> Result<String, TokenError> {
        self.issue(subject_id, self.default_ttl)
    }

    /// Verify signature, subject and expiry, in that order.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<TokenPayload>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            },
        )?;
        let payload = data.claims;

        if payload.sub.trim().is_empty() {
            return Err(TokenError::Malformed("subject is empty".to_string()));
        }
        if self.clock.now() >= payload.exp {
            return Err(TokenError::Expired);
        }

        Ok(Claims::from_verified(payload))
    }
}
