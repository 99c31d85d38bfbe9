// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route access policy.
//!
//! Routes are annotated when they are registered, either on the route
//! itself or on the group that contains it. The nearest annotation wins
//! (route over group) and a route with no annotation at all requires
//! authentication. Resolution happens once in [`PolicyBuilder::build`];
//! the resulting [`PolicyRegistry`] is an immutable map consulted per
//! request without I/O.
//!
//! ```rust,ignore
//! let auth = RouteGroup::new("/v1/auth", None);
//! let policy = PolicyRegistry::builder()
//!     .route(&auth, Method::POST, "/verify", Some(Access::Public))
//!     .route(&auth, Method::GET, "/profile", None)
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

/// Access annotation attached to a route or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No authentication required
    Public,
    /// Bearer token required
    Authenticated,
}

/// Resolve the effective policy from route and group annotations.
///
/// Returns `true` when the route is public.
pub fn resolve(route: Option<Access>, group: Option<Access>) -> bool {
    matches!(route.or(group), Some(Access::Public))
}

/// Route identity used for policy lookups: method plus path template
/// (the same template axum reports as `MatchedPath`).
///
/// `HEAD` is folded into `GET`, matching how axum routes `HEAD` requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    method: Method,
    path: String,
}

impl RouteKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let method = if method == Method::HEAD {
            Method::GET
        } else {
            method
        };
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("route {0} is registered more than once")]
    DuplicateRoute(String),
    #[error("route {0} uses a method the router cannot serve")]
    UnsupportedMethod(String),
}

/// Resolved access policy for every registered route.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    routes: HashMap<RouteKey, bool>,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Whether `route` may be called without authentication.
    ///
    /// Unknown routes are never public.
    pub fn is_public(&self, route: &RouteKey) -> bool {
        self.routes.get(route).copied().unwrap_or(false)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, route: &RouteKey) -> bool {
        self.routes.contains_key(route)
    }
}

/// Path prefix and default annotation shared by a set of routes.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    prefix: String,
    access: Option<Access>,
}

impl RouteGroup {
    pub fn new(prefix: &str, access: Option<Access>) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            access,
        }
    }

    /// Full path of `path` inside the group. An empty path is the prefix
    /// itself.
    pub fn path(&self, path: &str) -> String {
        match path {
            "" => self.prefix.clone(),
            p if p.starts_with('/') => format!("{}{}", self.prefix, p),
            p => format!("{}/{}", self.prefix, p),
        }
    }
}

/// Collects route annotations; see the module docs.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    entries: Vec<(RouteKey, bool)>,
}

impl PolicyBuilder {
    /// Register `path` inside `group` with an optional route-level annotation.
    pub fn route(
        mut self,
        group: &RouteGroup,
        method: Method,
        path: &str,
        access: Option<Access>,
    ) -> Self {
        self.entries.push((
            RouteKey::new(method, group.path(path)),
            resolve(access, group.access),
        ));
        self
    }

    pub fn build(self) -> Result<PolicyRegistry, PolicyError> {
        let mut routes = HashMap::with_capacity(self.entries.len());
        for (key, public) in self.entries {
            if routes.contains_key(&key) {
                return Err(PolicyError::DuplicateRoute(key.to_string()));
            }
            routes.insert(key, public);
        }
        Ok(PolicyRegistry { routes })
    }
}
