// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pool secret decoding.
//!
//! The pool secret may be provided in any of the text forms that common
//! tooling produces:
//!
//! - a JSON byte array (`[12,34,...]`, the CLI keypair-file form)
//! - base58
//! - base64
//!
//! Whatever the text form, the decoded bytes must be either a 64-byte
//! keypair (secret seed followed by its public key) or a 32-byte seed.

use base64ct::{Base64, Encoding};
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::keypair::keypair_from_seed;

/// Length of a full keypair (seed || public key).
pub const KEYPAIR_LEN: usize = 64;

/// Length of a bare seed.
pub const SEED_LEN: usize = 32;

/// Which binary form the secret was provided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretEncoding {
    /// 64-byte keypair; the embedded public half was verified.
    Keypair,
    /// 32-byte seed; the keypair was derived from it.
    Seed,
}

/// Errors raised while decoding the pool secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("secret is empty")]
    Empty,

    #[error("secret JSON array is invalid: {0}")]
    InvalidJson(String),

    #[error("secret is neither base58 nor base64 encoded {SEED_LEN} or {KEYPAIR_LEN} bytes")]
    UnrecognizedEncoding,

    #[error("secret decodes to {0} bytes (expected {SEED_LEN} or {KEYPAIR_LEN})")]
    WrongLength(usize),

    #[error("keypair public half does not match its secret half")]
    KeypairMismatch,

    #[error("seed was rejected: {0}")]
    InvalidSeed(String),
}

/// Decode the text form of a secret to raw bytes.
pub fn decode_secret(raw: &str) -> Result<Vec<u8>, SecretError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SecretError::Empty);
    }

    if trimmed.starts_with('[') {
        let bytes: Vec<u8> = serde_json::from_str(trimmed)
            .map_err(|e| SecretError::InvalidJson(e.to_string()))?;
        return check_length(bytes);
    }

    if let Ok(bytes) = bs58::decode(trimmed).into_vec() {
        if is_supported_length(bytes.len()) {
            return Ok(bytes);
        }
    }

    match Base64::decode_vec(trimmed) {
        Ok(bytes) if is_supported_length(bytes.len()) => Ok(bytes),
        Ok(bytes) => Err(SecretError::WrongLength(bytes.len())),
        Err(_) => Err(SecretError::UnrecognizedEncoding),
    }
}

/// Build a keypair from raw secret bytes.
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<(Keypair, SecretEncoding), SecretError> {
    match bytes.len() {
        KEYPAIR_LEN => {
            let (seed, public) = bytes.split_at(SEED_LEN);
            let keypair = seed_keypair(seed)?;
            if keypair.pubkey().to_bytes().as_slice() != public {
                return Err(SecretError::KeypairMismatch);
            }
            Ok((keypair, SecretEncoding::Keypair))
        }
        SEED_LEN => Ok((seed_keypair(bytes)?, SecretEncoding::Seed)),
        other => Err(SecretError::WrongLength(other)),
    }
}

/// Decode a secret in any supported text form into a keypair.
pub fn keypair_from_text(raw: &str) -> Result<(Keypair, SecretEncoding), SecretError> {
    let bytes = decode_secret(raw)?;
    keypair_from_bytes(&bytes)
}

fn seed_keypair(seed: &[u8]) -> Result<Keypair, SecretError> {
    keypair_from_seed(seed).map_err(|e| SecretError::InvalidSeed(e.to_string()))
}

fn is_supported_length(len: usize) -> bool {
    len == KEYPAIR_LEN || len == SEED_LEN
}

fn check_length(bytes: Vec<u8>) -> Result<Vec<u8>, SecretError> {
    if is_supported_length(bytes.len()) {
        Ok(bytes)
    } else {
        Err(SecretError::WrongLength(bytes.len()))
    }
}
