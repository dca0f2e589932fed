// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Delegated Authorization
//!
//! The service never talks to the vault with a standing credential. For each
//! record and each operation it mints a short-lived token:
//!
//! 1. the application's long-lived secp256k1 key signs the token
//!    (issuer = `did:vault:<public key>`),
//! 2. the token is addressed to the acting user identity (`USER_DID`),
//! 3. the `cmd` claim scopes it to create, read, update or delete,
//! 4. it expires one hour after issuance.
//!
//! A bulk write of N records therefore mints N create tokens.

pub mod delegation;
pub mod error;
pub mod keys;

pub use delegation::{DelegationClaims, DelegationMinter, DelegationToken, Operation};
pub use error::DelegationError;
