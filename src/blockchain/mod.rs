// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Network integration for the pool.
//!
//! This module provides functionality for:
//! - Decoding the pool secret into a keypair
//! - Building and signing transfer transactions
//! - Talking to the JSON-RPC node and polling for confirmation

pub mod client;
pub mod confirm;
pub mod signing;
pub mod transactions;
pub mod types;

pub use client::{ChainClient, ClientError, RpcClient, SubmitOptions};
pub use types::*;
