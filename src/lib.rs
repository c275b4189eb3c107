// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Invoicing API - Bearer Authentication Service
//!
//! This crate resolves `Authorization: Bearer` tokens to stored user
//! identities, accepting both Firebase ID tokens and legacy self-issued
//! session tokens while clients migrate.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification and identity resolution
//! - `config` - Environment configuration
//! - `jwks_refresher` - Background Firebase key refresh
//! - `storage` - Identity store (redb)
//! - `telemetry` - Tracing setup

pub mod api;
pub mod auth;
pub mod config;
pub mod jwks_refresher;
pub mod state;
pub mod storage;
pub mod telemetry;
