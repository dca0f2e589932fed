// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Expense Vault Server - REST proxy to an encrypted record vault
//!
//! Expense records live in an external vault. This crate validates requests,
//! authorizes each vault call with a freshly minted delegation token, and
//! keeps a local ledger of created record ids so the collection can be
//! enumerated and pruned when records disappear remotely.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Delegation token minting (secp256k1)
//! - `storage` - Identifier ledger and its persistence
//! - `vault` - Vault backends (HTTP client, in-memory)
//! - `validation` - Request validation gate

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod validation;
pub mod vault;
