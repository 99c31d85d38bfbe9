// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! Decides, for every request to the guarded router, whether it may proceed
//! and as which identity.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. Middleware:
//!    - Looks up the route in the access policy registry (public routes pass)
//!    - Verifies the HS256 signature, `sub` and expiry
//!    - Resolves `sub` to an active identity
//!    - Attaches an `AuthenticatedContext` to the request
//! 3. Handlers read the context with the `Auth` / `AdminOnly` extractors
//!
//! Tokens are obtained from `POST /v1/auth/login` (email and password,
//! checked against a PBKDF2 hash) or issued by an admin.
//!
//! ## Security
//!
//! - Routes without an access annotation require authentication
//! - Every rejection goes through `error::classify`; responses never say
//!   which step failed
//! - No clock skew tolerance: tokens are valid while `now < exp`

pub mod claims;
pub mod clock;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod roles;
pub mod token;

pub use claims::{AuthenticatedContext, Claims};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{classify, classify_raw, AuthFailure, AuthorizationError, ErrorKind, FailureReason};
pub use extractor::{AdminOnly, Auth};
pub use identity::{Credentials, Identity, IdentityStore, IdentityStoreError, InMemoryIdentityStore};
pub use middleware::{require_auth, Authorization, Authorizer};
pub use password::{PasswordError, PasswordHash};
pub use policy::{Access, PolicyBuilder, PolicyError, PolicyRegistry, RouteGroup, RouteKey};
pub use roles::Role;
pub use token::{TokenCodec, TokenError, MAX_TOKEN_TTL};
