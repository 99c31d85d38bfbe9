// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::api::access_policy;
use crate::auth::{Authorizer, Clock, IdentityStore, PolicyError, TokenCodec};
use crate::config::AuthSettings;

/// Shared application state.
///
/// Everything here is built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Authorizer,
    pub identities: Arc<dyn IdentityStore>,
}

impl AppState {
    /// Build the state with the route policy from [`access_policy`].
    pub fn new(
        settings: &AuthSettings,
        identities: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PolicyError> {
        let codec = Arc::new(TokenCodec::new(settings, clock));
        let policy = Arc::new(access_policy()?);
        Ok(Self {
            authorizer: Authorizer::new(codec, policy, identities.clone()),
            identities,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        self.authorizer.codec()
    }
}
