// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bookshelf Server - request authorization core
//!
//! Every request to the HTTP API is checked against a per-route access
//! policy, an HS256 bearer token and the identity store before a handler
//! runs.
//!
//! ## Modules
//!
//! - `auth` - Policy registry, token codec, identity store, middleware
//! - `api` - HTTP handlers and router (Axum)
//! - `config` - Startup configuration from the environment
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
