// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity records and the store the authorization path reads them from.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use super::password::{PasswordError, PasswordHash};
use super::roles::Role;

/// Account record keyed by token subject id.
///
/// Password material never appears here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Identity {
    /// Identity id (token subject)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Role used for privilege checks
    pub role: Role,
    /// Deactivated identities are never resolvable
    pub is_active: bool,
    /// When the identity was created
    pub created_at: DateTime<Utc>,
}

/// Identity store failure (not "not found", which is `Ok(None)`).
#[derive(Debug, thiserror::Error)]
pub enum IdentityStoreError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// An active identity together with its stored password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity: Identity,
    pub password: PasswordHash,
}

/// Lookup capability consumed by the authorization middleware and login.
///
/// Implementations must be read-only and idempotent.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find an identity by id, returning `None` if it is missing or deactivated.
    async fn find_active_by_id(&self, id: &str) -> Result<Option<Identity>, IdentityStoreError>;

    /// Find the active identity registered under `email` that has a password.
    ///
    /// Stores that hold no credentials never match.
    async fn find_credentials_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<Credentials>, IdentityStoreError> {
        Ok(None)
    }

    /// Readiness check for the backing store.
    async fn check_health(&self) -> Result<(), IdentityStoreError> {
        Ok(())
    }
}

/// Process-local identity store.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
    passwords: RwLock<HashMap<String, PasswordHash>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an identity record.
    pub async fn insert(&self, identity: Identity) -> Identity {
        self.identities
            .write()
            .await
            .insert(identity.id.clone(), identity.clone());
        identity
    }

    /// Create an active identity with a fresh UUID.
    pub async fn create(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Identity {
        self.insert(Identity {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            role,
            is_active: true,
            created_at: Utc::now(),
        })
        .await
    }

    /// Soft-delete an identity. Returns `false` if it does not exist.
    pub async fn deactivate(&self, id: &str) -> bool {
        match self.identities.write().await.get_mut(id) {
            Some(identity) => {
                identity.is_active = false;
                true
            }
            None => false,
        }
    }

    /// Set the login password of an existing identity. Returns `false` if
    /// it does not exist.
    pub async fn set_password(&self, id: &str, password: &str) -> Result<bool, PasswordError> {
        if !self.identities.read().await.contains_key(id) {
            return Ok(false);
        }
        let hash = PasswordHash::new(password)?;
        self.passwords.write().await.insert(id.to_string(), hash);
        Ok(true)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_active_by_id(&self, id: &str) -> Result<Option<Identity>, IdentityStoreError> {
        Ok(self
            .identities
            .read()
            .await
            .get(id)
            .filter(|identity| identity.is_active)
            .cloned())
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Credentials>, IdentityStoreError> {
        let identities = self.identities.read().await;
        let passwords = self.passwords.read().await;
        Ok(identities
            .values()
            .filter(|identity| identity.is_active && identity.email.eq_ignore_ascii_case(email))
            .find_map(|identity| {
                passwords.get(&identity.id).map(|password| Credentials {
                    identity: identity.clone(),
                    password: password.clone(),
                })
            }))
    }
}
