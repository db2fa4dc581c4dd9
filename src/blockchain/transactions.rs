// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer building and signing.
//!
//! A withdrawal is always a single System Program `Transfer` from the pool to
//! one recipient, with the pool as fee payer and sole signer. The message is
//! compiled by `solana-sdk`; this module only decides what goes into it.
//!
//! Building and signing are pure: identical inputs (including the reference
//! hash) produce identical transactions.

use solana_sdk::message::Message;
use solana_sdk::system_instruction;
use solana_sdk::system_program;
use solana_sdk::transaction::Transaction;

use super::types::{Pubkey, ReferenceHash, Signature, MAX_SAFE_LAMPORTS};
use crate::custody::PoolCredential;

/// Errors raised while building or signing a transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("amount must be between 1 and {MAX_SAFE_LAMPORTS} lamports, got {0}")]
    InvalidAmount(u64),

    #[error("recipient {0} cannot receive a pool transfer")]
    InvalidRecipient(Pubkey),

    #[error("transfer is funded by {expected} but the credential controls {actual}")]
    SignerMismatch { expected: Pubkey, actual: Pubkey },

    #[error("signing failed: {0}")]
    Signing(String),
}

/// A compiled transfer message, bound to one reference hash, not yet signed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransfer {
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
    pub reference: ReferenceHash,
    message: Message,
}

impl UnsignedTransfer {
    /// The message that gets signed.
    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// An immutable, wire-ready signed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    signature: Signature,
    reference: ReferenceHash,
    transaction: Transaction,
}

impl SignedTransaction {
    /// The transaction's signature, which is also its identifier.
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// The reference hash this transaction is bound to.
    pub fn reference(&self) -> ReferenceHash {
        self.reference
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }
}

/// Build an unsigned transfer of `lamports` from `from` to `to`.
pub fn build_transfer(
    from: Pubkey,
    to: Pubkey,
    lamports: u64,
    reference: ReferenceHash,
) -> Result<UnsignedTransfer, BuildError> {
    if lamports == 0 || lamports > MAX_SAFE_LAMPORTS {
        return Err(BuildError::InvalidAmount(lamports));
    }
    if to == from || to == system_program::id() {
        return Err(BuildError::InvalidRecipient(to));
    }

    let instruction = system_instruction::transfer(&from, &to, lamports);
    let message = Message::new_with_blockhash(&[instruction], Some(&from), &reference.blockhash);

    Ok(UnsignedTransfer {
        from,
        to,
        lamports,
        reference,
        message,
    })
}

/// Sign a transfer with the pool credential.
pub fn sign_transfer(
    transfer: &UnsignedTransfer,
    credential: &PoolCredential,
) -> Result<SignedTransaction, BuildError> {
    let signer = credential.address();
    if signer != transfer.from {
        return Err(BuildError::SignerMismatch {
            expected: transfer.from,
            actual: signer,
        });
    }

    let mut transaction = Transaction::new_unsigned(transfer.message.clone());
    credential
        .sign_transaction(&mut transaction, transfer.reference.blockhash)
        .map_err(|e| BuildError::Signing(e.to_string()))?;
    let signature = transaction
        .signatures
        .first()
        .copied()
        .ok_or_else(|| BuildError::Signing("transaction carries no signature".into()))?;

    Ok(SignedTransaction {
        signature,
        reference: transfer.reference,
        transaction,
    })
}

/// Errors raised while parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount `{0}` is not a decimal number")]
    Malformed(String),

    #[error("amount has more than {0} decimal places")]
    TooPrecise(u8),

    #[error("amount overflows")]
    Overflow,
}

/// Parse a human-readable amount (e.g. `"1.5"`) to minimal units.
///
/// # Arguments
/// * `amount` - Decimal string; no sign, no exponent
/// * `decimals` - Decimal places of the unit (9 for SOL)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<u64, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Malformed(amount.to_string()));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise(decimals));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };

    // Pad with zeros to match decimals
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<width$}", fraction, width = decimals as usize)
            .parse()
            .map_err(|_| AmountError::Malformed(amount.to_string()))?
    };

    let multiplier = 10u64.pow(decimals as u32);
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(AmountError::Overflow)
}

/// Format minimal units as a human-readable amount.
pub fn format_amount(amount: u64, decimals: u8) -> String {
    let divisor = 10u64.pow(decimals as u32);
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder == 0 {
        return whole.to_string();
    }

    let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
    format!("{}.{}", whole, decimal_str.trim_end_matches('0'))
}
