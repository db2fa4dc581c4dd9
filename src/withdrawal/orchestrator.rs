// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Withdrawal Orchestrator
//!
//! Drives one withdrawal from request to terminal state:
//!
//! ```text
//! Validating -> Building -> Submitting -> Confirming -> Succeeded
//!                  ^                          |       -> SucceededUnconfirmed
//!                  +---- hash expiry (once) --+       -> Failed
//! ```
//!
//! ## Retry rule
//!
//! A hash-expiry failure, reported by the node at submission or detected
//! while confirming, restarts at `Building` with a freshly fetched reference
//! hash. This happens at most `max_rebuilds` times (one by default). The same
//! signed bytes are never submitted twice. Every other failure is terminal.
//!
//! Two independently built transfers for one request can both land only if a
//! node accepts a transaction after reporting its hash expired. That residual
//! risk is accepted in exchange for not running a two-phase commit.
//!
//! ## Ambiguity
//!
//! Once a transaction may have been broadcast, the withdrawal never reports
//! plain failure unless the chain says it cannot land. A confirmation timeout
//! is `SucceededUnconfirmed` and carries the signature.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::journal::{WithdrawalJournal, WithdrawalRecord};
use super::request::{ValidatedWithdrawal, ValidationError, WithdrawalRequest};
use crate::blockchain::client::{ChainClient, ClientError, SubmitOptions};
use crate::blockchain::confirm::{poll_status, PollPolicy};
use crate::blockchain::transactions::{build_transfer, sign_transfer, BuildError, SignedTransaction};
use crate::blockchain::types::{
    Commitment, FailureKind, Signature, SubmissionOutcome, SIGNATURE_FEE_LAMPORTS,
};
use crate::config::WithdrawalConfig;
use crate::custody::PoolCredential;

/// Pipeline state of one withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalState {
    Validating,
    Building,
    Submitting,
    Confirming,
    Succeeded,
    SucceededUnconfirmed,
    Failed,
}

impl WithdrawalState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WithdrawalState::Succeeded
                | WithdrawalState::SucceededUnconfirmed
                | WithdrawalState::Failed
        )
    }
}

impl fmt::Display for WithdrawalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WithdrawalState::Validating => "validating",
            WithdrawalState::Building => "building",
            WithdrawalState::Submitting => "submitting",
            WithdrawalState::Confirming => "confirming",
            WithdrawalState::Succeeded => "succeeded",
            WithdrawalState::SucceededUnconfirmed => "succeeded_unconfirmed",
            WithdrawalState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a successful withdrawal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finality {
    Confirmed(Commitment),
    /// Broadcast, but the target commitment was not observed in time.
    Unconfirmed { last_seen: Option<Commitment> },
}

/// A withdrawal that reached `Succeeded` or `SucceededUnconfirmed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalOutcome {
    pub request_id: Uuid,
    pub signature: Signature,
    pub lamports: u64,
    pub finality: Finality,
    /// Rebuilds after hash expiry.
    pub rebuilds: u32,
}

/// A withdrawal that reached `Failed`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WithdrawalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("reference `{reference}` is already used by withdrawal {holder}")]
    DuplicateReference { reference: String, holder: Uuid },

    #[error("reference hash expired after {attempts} attempts")]
    HashExpired { attempts: u32 },

    #[error("pool has insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("transaction rejected: {reason}")]
    Rejected {
        kind: FailureKind,
        reason: String,
        signature: Option<Signature>,
    },

    #[error("node error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to build transfer: {0}")]
    Build(#[from] BuildError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WithdrawalError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            WithdrawalError::Validation(e) => e.code(),
            WithdrawalError::DuplicateReference { .. } => "duplicate_reference",
            WithdrawalError::HashExpired { .. } => "hash_expired",
            WithdrawalError::InsufficientFunds(_) => "insufficient_funds",
            WithdrawalError::Rejected { .. } => "transaction_rejected",
            WithdrawalError::Remote { .. } => "remote_error",
            WithdrawalError::Network(_) => "network_error",
            WithdrawalError::Build(_) | WithdrawalError::Internal(_) => "internal_error",
        }
    }
}

impl From<ClientError> for WithdrawalError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Remote {
                kind: FailureKind::InsufficientFunds,
                message,
                ..
            } => WithdrawalError::InsufficientFunds(message),
            ClientError::Remote {
                kind: FailureKind::ProgramRejected,
                message,
                ..
            } => WithdrawalError::Rejected {
                kind: FailureKind::ProgramRejected,
                reason: message,
                signature: None,
            },
            ClientError::Remote { code, message, .. } => WithdrawalError::Remote { code, message },
            ClientError::Network(msg)
            | ClientError::Indeterminate(msg)
            | ClientError::InvalidResponse(msg)
            | ClientError::Configuration(msg) => WithdrawalError::Network(msg),
        }
    }
}

/// What a single build/submit/confirm attempt ended with.
enum Attempt {
    Landed(WithdrawalOutcome),
    Expired,
}

/// Runs withdrawals against the network with the pool credential.
pub struct WithdrawalOrchestrator {
    chain: Arc<dyn ChainClient>,
    credential: Arc<PoolCredential>,
    journal: Arc<WithdrawalJournal>,
    config: WithdrawalConfig,
}

impl WithdrawalOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        credential: Arc<PoolCredential>,
        journal: Arc<WithdrawalJournal>,
        config: WithdrawalConfig,
    ) -> Self {
        Self {
            chain,
            credential,
            journal,
            config,
        }
    }

    /// Run `request` to a terminal state.
    ///
    /// Validation failures make no network calls and leave no journal entry.
    #[instrument(name = "withdrawal", skip_all, fields(%request_id))]
    pub async fn execute(
        &self,
        request_id: Uuid,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalOutcome, WithdrawalError> {
        let pool = self.credential.address();
        let validated = request.validate(&pool, self.config.max_lamports)?;

        if let Some(reference) = validated.reference.as_deref() {
            self.journal
                .claim_reference(reference, request_id)
                .map_err(|taken| WithdrawalError::DuplicateReference {
                    reference: reference.to_string(),
                    holder: taken.holder,
                })?;
        }
        self.journal.insert(WithdrawalRecord::new(
            request_id,
            validated.recipient.to_string(),
            validated.lamports,
            validated.reference.clone(),
        ));

        info!(
            recipient = %validated.recipient,
            lamports = validated.lamports,
            reference = validated.reference.as_deref().unwrap_or(""),
            "Withdrawal accepted"
        );

        let result = self.run(request_id, &validated).await;
        self.finish(request_id, &validated, &result);
        result
    }

    async fn run(
        &self,
        request_id: Uuid,
        withdrawal: &ValidatedWithdrawal,
    ) -> Result<WithdrawalOutcome, WithdrawalError> {
        if self.config.preflight_balance_check {
            self.check_pool_balance(withdrawal.lamports).await?;
        }

        let mut rebuilds = 0;
        loop {
            match self.attempt(request_id, withdrawal, rebuilds).await? {
                Attempt::Landed(outcome) => return Ok(outcome),
                Attempt::Expired if rebuilds < self.config.max_rebuilds => {
                    rebuilds += 1;
                    warn!(attempt = rebuilds + 1, "Reference hash expired; rebuilding with a fresh hash");
                }
                Attempt::Expired => {
                    return Err(WithdrawalError::HashExpired {
                        attempts: rebuilds + 1,
                    });
                }
            }
        }
    }

    /// One pass of Building -> Submitting -> Confirming.
    async fn attempt(
        &self,
        request_id: Uuid,
        withdrawal: &ValidatedWithdrawal,
        rebuilds: u32,
    ) -> Result<Attempt, WithdrawalError> {
        self.transition(request_id, WithdrawalState::Building);
        let signed = self.build(withdrawal).await?;
        let signature = signed.signature();
        self.journal.update(request_id, |r| {
            r.attempts = rebuilds + 1;
            r.signature = Some(signature.to_string());
        });

        self.transition(request_id, WithdrawalState::Submitting);
        let options = SubmitOptions {
            skip_preflight: self.config.skip_preflight,
            preflight_commitment: self.config.blockhash_commitment,
        };
        match self.chain.submit(&signed, options).await {
            Ok(_) => info!(%signature, attempt = rebuilds + 1, "Transaction submitted"),
            Err(e) if e.failure_kind() == Some(FailureKind::HashExpiry) => {
                warn!(%signature, error = %e, "Submission rejected: reference hash expired");
                return Ok(Attempt::Expired);
            }
            Err(e) if e.is_ambiguous() => {
                // The node may hold the transaction; only the chain can say.
                warn!(%signature, error = %e, "Submission outcome unknown; polling by signature");
            }
            Err(e) => return Err(e.into()),
        }

        self.transition(request_id, WithdrawalState::Confirming);
        let policy = PollPolicy {
            interval: self.config.poll_interval,
            timeout: self.config.confirm_timeout,
            target: self.config.confirm_commitment,
        };
        let outcome = poll_status(
            self.chain.as_ref(),
            signature,
            signed.reference().last_valid_block_height,
            &policy,
        )
        .await;

        match outcome {
            SubmissionOutcome::Confirmed {
                signature,
                commitment,
            } => Ok(Attempt::Landed(WithdrawalOutcome {
                request_id,
                signature,
                lamports: withdrawal.lamports,
                finality: Finality::Confirmed(commitment),
                rebuilds,
            })),
            SubmissionOutcome::Unknown {
                signature,
                last_seen,
            } => Ok(Attempt::Landed(WithdrawalOutcome {
                request_id,
                signature,
                lamports: withdrawal.lamports,
                finality: Finality::Unconfirmed { last_seen },
                rebuilds,
            })),
            SubmissionOutcome::Rejected {
                kind: FailureKind::HashExpiry,
                reason,
                ..
            } => {
                warn!(%signature, %reason, "Transaction can no longer land");
                Ok(Attempt::Expired)
            }
            SubmissionOutcome::Rejected {
                kind: FailureKind::InsufficientFunds,
                reason,
                ..
            } => Err(WithdrawalError::InsufficientFunds(reason)),
            SubmissionOutcome::Rejected {
                signature,
                kind,
                reason,
            } => Err(WithdrawalError::Rejected {
                kind,
                reason,
                signature: Some(signature),
            }),
        }
    }

    /// Fetch a fresh reference hash and sign the transfer against it.
    async fn build(&self, withdrawal: &ValidatedWithdrawal) -> Result<SignedTransaction, WithdrawalError> {
        let reference = self
            .chain
            .latest_reference_hash(self.config.blockhash_commitment)
            .await?;
        let unsigned = build_transfer(
            self.credential.address(),
            withdrawal.recipient,
            withdrawal.lamports,
            reference,
        )?;
        Ok(sign_transfer(&unsigned, &self.credential)?)
    }

    async fn check_pool_balance(&self, lamports: u64) -> Result<(), WithdrawalError> {
        let pool = self.credential.address();
        let available = self
            .chain
            .balance(&pool, self.config.blockhash_commitment)
            .await?;
        let required = lamports.saturating_add(SIGNATURE_FEE_LAMPORTS);
        if available < required {
            return Err(WithdrawalError::InsufficientFunds(format!(
                "pool holds {available} lamports, withdrawal needs {required} including fees"
            )));
        }
        Ok(())
    }

    fn transition(&self, request_id: Uuid, state: WithdrawalState) {
        self.journal.update(request_id, |r| r.state = state);
        tracing::debug!(%state, "Withdrawal state changed");
    }

    fn finish(
        &self,
        request_id: Uuid,
        withdrawal: &ValidatedWithdrawal,
        result: &Result<WithdrawalOutcome, WithdrawalError>,
    ) {
        match result {
            Ok(outcome) => {
                let (state, commitment) = match outcome.finality {
                    Finality::Confirmed(c) => (WithdrawalState::Succeeded, Some(c)),
                    Finality::Unconfirmed { last_seen } => {
                        (WithdrawalState::SucceededUnconfirmed, last_seen)
                    }
                };
                self.journal.update(request_id, |r| {
                    r.state = state;
                    r.signature = Some(outcome.signature.to_string());
                    r.commitment = commitment;
                });
                info!(
                    signature = %outcome.signature,
                    %state,
                    rebuilds = outcome.rebuilds,
                    "Withdrawal finished"
                );
            }
            Err(err) => {
                self.journal.update(request_id, |r| {
                    r.state = WithdrawalState::Failed;
                    r.error = Some(err.to_string());
                    r.error_code = Some(err.code().to_string());
                });
                if let Some(reference) = withdrawal.reference.as_deref() {
                    self.journal.release_reference(reference, request_id);
                }
                warn!(error = %err, code = err.code(), "Withdrawal failed");
            }
        }
    }
}
