// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IAM Server - Multi-tenant Identity and Access Management
//!
//! Accounts (tenants) own users; users own credentials ("identities").
//! A successful password sign-in yields an RS256 bearer token whose
//! audience is the account and whose subject is the user.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token signing/verification and password hashing
//! - `names` - Resource names (`accounts/{id}/users/{slug}`)
//! - `service` - Authentication, provisioning and user management
//! - `storage` - Credential store (redb or in-memory)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod names;
pub mod service;
pub mod shutdown;
pub mod state;
pub mod storage;
