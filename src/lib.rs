// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Pool Relay - Custodial Payout Relay Service
//!
//! Holds the pool's Ed25519 signing key and turns withdrawal requests into
//! signed System Program transfers on a Solana-style network, resubmitting
//! with a fresh reference hash when the first one expires.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - JSON-RPC client, transfer building and confirmation
//! - `custody` - Pool key loading and signing
//! - `withdrawal` - Validation, rate gate, journal and orchestration

pub mod api;
pub mod blockchain;
pub mod config;
pub mod custody;
pub mod error;
pub mod state;
pub mod withdrawal;

#[cfg(test)]
pub(crate) mod test_support;
