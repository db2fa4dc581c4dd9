// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal request wire type and normalization.
//!
//! Normalization is pure: it never touches the network, so a request that
//! fails here costs no RPC calls.

use serde::Deserialize;
use serde_json::{Number, Value};
use solana_sdk::pubkey::ParsePubkeyError;
use solana_sdk::system_program;
use utoipa::ToSchema;

use crate::blockchain::transactions::{parse_amount, AmountError};
use crate::blockchain::types::{Pubkey, LAMPORTS_PER_SOL, MAX_SAFE_LAMPORTS, SOL_DECIMALS};

/// Longest accepted reference tag.
pub const MAX_REFERENCE_LEN: usize = 128;

/// Body of `POST /withdraw`.
///
/// Exactly one of `amountLamports` (integer minimal units) and `amount`
/// (decimal SOL) must be supplied.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    /// Recipient address (base58). Alias: `to`.
    #[serde(default, alias = "to")]
    #[schema(example = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin")]
    pub recipient: Option<String>,

    /// Amount in lamports, as an integer or a string of digits.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "1000000")]
    pub amount_lamports: Option<Value>,

    /// Amount in SOL, as a number or a decimal string.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "0.001")]
    pub amount: Option<Value>,

    /// Optional idempotency tag, e.g. the upstream deposit signature.
    /// Alias: `depositSignature`.
    #[serde(default, alias = "depositSignature")]
    pub reference: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWithdrawal {
    pub recipient: Pubkey,
    pub lamports: u64,
    pub reference: Option<String>,
}

/// Caller errors. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("recipient is required")]
    MissingRecipient,

    #[error("recipient is not a valid address: {0}")]
    InvalidRecipient(ParsePubkeyError),

    #[error("recipient must differ from the pool address")]
    SelfTransfer,

    #[error("recipient {0} cannot receive transfers")]
    ReservedRecipient(Pubkey),

    #[error("one of amountLamports or amount is required")]
    MissingAmount,

    #[error("supply only one of amountLamports and amount")]
    AmbiguousAmount,

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("amount is invalid: {0}")]
    InvalidAmount(String),

    #[error("amount exceeds the maximum of {max} lamports")]
    AmountTooLarge { max: u64 },

    #[error("reference must be at most {MAX_REFERENCE_LEN} characters")]
    InvalidReference,
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingRecipient
            | ValidationError::InvalidRecipient(_)
            | ValidationError::SelfTransfer
            | ValidationError::ReservedRecipient(_) => "invalid_recipient",
            ValidationError::MissingAmount
            | ValidationError::AmbiguousAmount
            | ValidationError::NonPositiveAmount
            | ValidationError::InvalidAmount(_)
            | ValidationError::AmountTooLarge { .. } => "invalid_amount",
            ValidationError::InvalidReference => "invalid_reference",
        }
    }
}

impl WithdrawalRequest {
    /// Normalize into a [`ValidatedWithdrawal`] paid from `pool`.
    ///
    /// `max_lamports` is an optional operator cap below the safe-integer bound.
    pub fn validate(
        &self,
        pool: &Pubkey,
        max_lamports: Option<u64>,
    ) -> Result<ValidatedWithdrawal, ValidationError> {
        let recipient = parse_recipient(self.recipient.as_deref(), pool)?;

        let lamports = match (&self.amount_lamports, &self.amount) {
            (Some(_), Some(_)) => return Err(ValidationError::AmbiguousAmount),
            (Some(raw), None) => lamports_from_value(raw)?,
            (None, Some(raw)) => lamports_from_sol_value(raw)?,
            (None, None) => return Err(ValidationError::MissingAmount),
        };

        let max = max_lamports
            .map(|cap| cap.min(MAX_SAFE_LAMPORTS))
            .unwrap_or(MAX_SAFE_LAMPORTS);
        if lamports > max {
            return Err(ValidationError::AmountTooLarge { max });
        }

        let reference = match self.reference.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(tag) if tag.chars().count() > MAX_REFERENCE_LEN => {
                return Err(ValidationError::InvalidReference)
            }
            Some(tag) => Some(tag.to_string()),
        };

        Ok(ValidatedWithdrawal {
            recipient,
            lamports,
            reference,
        })
    }
}

fn parse_recipient(raw: Option<&str>, pool: &Pubkey) -> Result<Pubkey, ValidationError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingRecipient)?;
    let recipient: Pubkey = raw.parse().map_err(ValidationError::InvalidRecipient)?;
    if recipient == *pool {
        return Err(ValidationError::SelfTransfer);
    }
    if recipient == system_program::id() {
        return Err(ValidationError::ReservedRecipient(recipient));
    }
    Ok(recipient)
}

/// Integer lamports from a JSON number or digit string.
fn lamports_from_value(raw: &Value) -> Result<u64, ValidationError> {
    let lamports = match raw {
        Value::Number(n) => integer_from_number(n)?,
        Value::String(s) => {
            let s = s.trim();
            if let Some(rest) = s.strip_prefix('-') {
                if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ValidationError::NonPositiveAmount);
                }
            }
            if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
                return Err(ValidationError::InvalidAmount(
                    "amountLamports must be an integer".into(),
                ));
            }
            s.parse::<u64>()
                .map_err(|_| ValidationError::AmountTooLarge { max: MAX_SAFE_LAMPORTS })?
        }
        _ => {
            return Err(ValidationError::InvalidAmount(
                "amountLamports must be an integer".into(),
            ))
        }
    };
    if lamports == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(lamports)
}

fn integer_from_number(n: &Number) -> Result<u64, ValidationError> {
    if let Some(v) = n.as_u64() {
        return Ok(v);
    }
    if n.as_i64().is_some() {
        return Err(ValidationError::NonPositiveAmount);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f <= 0.0 => Err(ValidationError::NonPositiveAmount),
        Some(f) if f.is_finite() && f.fract() == 0.0 && f <= MAX_SAFE_LAMPORTS as f64 => {
            Ok(f as u64)
        }
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            Err(ValidationError::AmountTooLarge { max: MAX_SAFE_LAMPORTS })
        }
        _ => Err(ValidationError::InvalidAmount(
            "amountLamports must be an integer".into(),
        )),
    }
}

/// Lamports from a SOL amount given as a JSON number or decimal string.
fn lamports_from_sol_value(raw: &Value) -> Result<u64, ValidationError> {
    let lamports = match raw {
        Value::String(s) => {
            if s.trim().starts_with('-') {
                return Err(ValidationError::NonPositiveAmount);
            }
            parse_amount(s, SOL_DECIMALS).map_err(amount_error)?
        }
        Value::Number(n) => lamports_from_sol_number(n)?,
        _ => {
            return Err(ValidationError::InvalidAmount(
                "amount must be a number or decimal string".into(),
            ))
        }
    };
    if lamports == 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(lamports)
}

fn lamports_from_sol_number(n: &Number) -> Result<u64, ValidationError> {
    if let Some(whole) = n.as_u64() {
        return whole
            .checked_mul(LAMPORTS_PER_SOL)
            .ok_or(ValidationError::AmountTooLarge { max: MAX_SAFE_LAMPORTS });
    }
    let sol = n
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| ValidationError::InvalidAmount("amount is not finite".into()))?;
    if sol <= 0.0 {
        return Err(ValidationError::NonPositiveAmount);
    }

    let scaled = sol * LAMPORTS_PER_SOL as f64;
    if scaled > MAX_SAFE_LAMPORTS as f64 {
        return Err(ValidationError::AmountTooLarge { max: MAX_SAFE_LAMPORTS });
    }
    let rounded = scaled.round();
    // Binary floats carry representation noise well below one lamport.
    if (scaled - rounded).abs() > 1e-3 {
        return Err(ValidationError::InvalidAmount(format!(
            "amount has more than {SOL_DECIMALS} decimal places"
        )));
    }
    Ok(rounded as u64)
}

fn amount_error(err: AmountError) -> ValidationError {
    match err {
        AmountError::Overflow => ValidationError::AmountTooLarge { max: MAX_SAFE_LAMPORTS },
        other => ValidationError::InvalidAmount(other.to_string()),
    }
}
