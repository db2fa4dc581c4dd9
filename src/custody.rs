// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Custody
//!
//! Loads the pool's signing credential once at startup and holds it for the
//! process lifetime. The credential is read-only after load and is shared
//! between request tasks without locking.
//!
//! ## Startup checks
//!
//! Loading fails (and the process must not start) when:
//! - no secret is configured
//! - the secret decodes to neither a 64-byte keypair nor a 32-byte seed
//! - the derived address differs from the configured expected address and
//!   the mismatch policy is [`MismatchPolicy::Fatal`]
//!
//! The secret is never logged; `Debug` output is redacted.

use std::fmt;

use solana_sdk::pubkey::ParsePubkeyError;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::Transaction;
use tracing::{info, warn};

use crate::blockchain::signing::{keypair_from_text, SecretEncoding, SecretError};
use crate::blockchain::types::{Hash, Pubkey};
use crate::config::{CustodyConfig, MismatchPolicy};

/// Errors that prevent the pool credential from loading.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("no pool secret configured")]
    MissingSecret,

    #[error("pool secret is invalid: {0}")]
    InvalidSecret(#[from] SecretError),

    #[error("expected pool address is invalid: {0}")]
    InvalidExpectedAddress(ParsePubkeyError),

    #[error("pool secret derives {derived} but the expected pool address is {expected}")]
    AddressMismatch { derived: Pubkey, expected: Pubkey },
}

/// The pool's signing credential.
pub struct PoolCredential {
    keypair: Keypair,
    address: Pubkey,
    encoding: SecretEncoding,
}

impl PoolCredential {
    /// Load the credential from custody configuration.
    pub fn load(config: &CustodyConfig) -> Result<Self, CustodyError> {
        let secret = config
            .secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(CustodyError::MissingSecret)?;

        let (keypair, encoding) = keypair_from_text(secret)?;
        let credential = Self::from_parts(keypair, encoding);

        if let Some(expected) = config.expected_address.as_deref() {
            let expected: Pubkey = expected
                .trim()
                .parse()
                .map_err(CustodyError::InvalidExpectedAddress)?;
            if expected != credential.address {
                match config.mismatch_policy {
                    MismatchPolicy::Fatal => {
                        return Err(CustodyError::AddressMismatch {
                            derived: credential.address,
                            expected,
                        });
                    }
                    MismatchPolicy::Warn => {
                        warn!(
                            derived = %credential.address,
                            expected = %expected,
                            "Pool secret does not match the expected pool address; continuing with derived address"
                        );
                    }
                }
            }
        }

        info!(
            pool = %credential.address,
            encoding = ?credential.encoding,
            "Pool credential loaded"
        );
        Ok(credential)
    }

    /// Wrap an existing keypair.
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self::from_parts(keypair, SecretEncoding::Keypair)
    }

    fn from_parts(keypair: Keypair, encoding: SecretEncoding) -> Self {
        let address = keypair.pubkey();
        Self {
            keypair,
            address,
            encoding,
        }
    }

    /// The pool's public address.
    pub fn address(&self) -> Pubkey {
        self.address
    }

    /// Sign `transaction` as its fee payer against `blockhash`.
    pub fn sign_transaction(
        &self,
        transaction: &mut Transaction,
        blockhash: Hash,
    ) -> Result<(), SignerError> {
        transaction.try_sign(&[&self.keypair], blockhash)
    }
}

impl fmt::Debug for PoolCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolCredential")
            .field("address", &self.address)
            .field("encoding", &self.encoding)
            .field("key", &"<redacted>")
            .finish()
    }
}
