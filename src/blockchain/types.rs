// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::instruction::InstructionError;
use solana_sdk::transaction::TransactionError;
use utoipa::ToSchema;

pub use solana_sdk::hash::Hash;
pub use solana_sdk::native_token::LAMPORTS_PER_SOL;
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::Signature;

/// Decimal places of the human-scale unit.
pub const SOL_DECIMALS: u8 = 9;

/// Largest lamport amount accepted from callers (2^53 - 1, exact in an f64).
pub const MAX_SAFE_LAMPORTS: u64 = 9_007_199_254_740_991;

/// Fee charged per signature, reserved when checking the pool balance.
pub const SIGNATURE_FEE_LAMPORTS: u64 = 5_000;

/// System Program error code for a debit that would leave negative lamports.
const SYSTEM_ERROR_RESULT_WITH_NEGATIVE_LAMPORTS: u32 = 1;

/// A recent blockhash together with the last block height at which it is accepted.
///
/// Transactions built against it are permanently rejected once the chain's
/// block height exceeds `last_valid_block_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceHash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

// =============================================================================
// Commitment / finality
// =============================================================================

/// Finality levels, ordered from least to most final.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    pub fn level(self) -> CommitmentLevel {
        match self {
            Commitment::Processed => CommitmentLevel::Processed,
            Commitment::Confirmed => CommitmentLevel::Confirmed,
            Commitment::Finalized => CommitmentLevel::Finalized,
        }
    }

    pub fn config(self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.level(),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!(
                "unknown commitment `{other}` (expected processed, confirmed or finalized)"
            )),
        }
    }
}

/// Status of a signature as reported by the node.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// Set when the transaction landed but its execution failed.
    pub err: Option<TransactionError>,
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Whether this status has reached `target`.
    pub fn reaches(&self, target: Commitment) -> bool {
        self.confirmation_status
            .map(|level| level >= target)
            .unwrap_or(false)
    }
}

/// Classification of a failure reported by the network.
///
/// Produced by the network client from the node's structured
/// [`TransactionError`] so the orchestrator never inspects error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The reference hash aged out before the transaction was included.
    HashExpiry,
    /// The pool cannot cover the amount plus fees.
    InsufficientFunds,
    /// A program (or the runtime) rejected the transaction for another reason.
    ProgramRejected,
    /// Anything else the node reported.
    Other,
}

impl FailureKind {
    pub fn classify(err: &TransactionError) -> Self {
        match err {
            TransactionError::BlockhashNotFound => FailureKind::HashExpiry,
            TransactionError::InsufficientFundsForFee
            | TransactionError::InsufficientFundsForRent { .. }
            | TransactionError::AccountNotFound => FailureKind::InsufficientFunds,
            TransactionError::InstructionError(
                _,
                InstructionError::Custom(SYSTEM_ERROR_RESULT_WITH_NEGATIVE_LAMPORTS),
            ) => FailureKind::InsufficientFunds,
            TransactionError::InstructionError(..) => FailureKind::ProgramRejected,
            _ => FailureKind::Other,
        }
    }
}

/// Terminal result of trying to land one signed transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Reached the configured finality threshold.
    Confirmed {
        signature: Signature,
        commitment: Commitment,
    },
    /// Will never land (or landed and failed).
    Rejected {
        signature: Signature,
        kind: FailureKind,
        reason: String,
    },
    /// Broadcast succeeded but finality was not observed within budget.
    Unknown {
        signature: Signature,
        last_seen: Option<Commitment>,
    },
}
