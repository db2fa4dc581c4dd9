// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confirmation polling.
//!
//! Polls a broadcast transaction by signature until it reaches the target
//! commitment, is rejected, or the time budget runs out. Polling never relies
//! on the reference hash still being valid: a transaction that landed before
//! its hash expired is reported as confirmed no matter how late we look.
//!
//! The reference hash's `last_valid_block_height` is used only in one
//! direction. When the node has never seen the signature and the chain is
//! already past that height, the transaction can no longer land, which is
//! reported as a [`FailureKind::HashExpiry`] rejection.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::client::ChainClient;
use super::types::{Commitment, FailureKind, Signature, SubmissionOutcome};

/// How to poll for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    /// Commitment that counts as confirmed.
    pub target: Commitment,
}

/// Poll `signature` until a terminal [`SubmissionOutcome`].
///
/// Never fails: transport errors are logged and polling continues, and an
/// exhausted budget yields [`SubmissionOutcome::Unknown`].
pub async fn poll_status(
    client: &dyn ChainClient,
    signature: Signature,
    last_valid_block_height: u64,
    policy: &PollPolicy,
) -> SubmissionOutcome {
    // A budget too large to represent never expires.
    let deadline = Instant::now().checked_add(policy.timeout);
    let mut last_seen: Option<Commitment> = None;
    // The signature was absent once with the chain past the expiry height.
    let mut expiry_suspected = false;

    loop {
        match client.signature_status(&signature).await {
            Ok(Some(status)) => {
                expiry_suspected = false;
                if let Some(err) = &status.err {
                    return SubmissionOutcome::Rejected {
                        signature,
                        kind: FailureKind::classify(err),
                        reason: format!("transaction failed on-chain: {err}"),
                    };
                }
                if status.reaches(policy.target) {
                    return SubmissionOutcome::Confirmed {
                        signature,
                        commitment: status.confirmation_status.unwrap_or(policy.target),
                    };
                }
                if status.confirmation_status.is_some() {
                    last_seen = status.confirmation_status;
                }
                debug!(%signature, status = ?last_seen, "Awaiting target commitment");
            }
            Ok(None) => match client.block_height(policy.target).await {
                Ok(height) if height > last_valid_block_height => {
                    if expiry_suspected {
                        return SubmissionOutcome::Rejected {
                            signature,
                            kind: FailureKind::HashExpiry,
                            reason: format!(
                                "block height {height} passed last valid height {last_valid_block_height} before inclusion"
                            ),
                        };
                    }
                    // Re-check after one interval before declaring expiry;
                    // the status may have been racing the height query.
                    expiry_suspected = true;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(%signature, error = %e, "Block height query failed while polling");
                }
            },
            Err(e) => {
                warn!(%signature, error = %e, "Signature status query failed; continuing to poll");
            }
        }

        let wait = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return SubmissionOutcome::Unknown {
                        signature,
                        last_seen,
                    };
                }
                policy.interval.min(deadline - now)
            }
            None => policy.interval,
        };
        sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::client::ClientError;
    use crate::blockchain::types::SignatureStatus;
    use crate::test_support::MockChain;
    use solana_sdk::instruction::InstructionError;
    use solana_sdk::transaction::TransactionError;

    fn sig() -> Signature {
        Signature::from([9u8; 64])
    }

    fn policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1_000),
            timeout: Duration::from_secs(10),
            target: Commitment::Confirmed,
        }
    }

    fn status(level: Commitment) -> SignatureStatus {
        SignatureStatus {
            slot: 5,
            err: None,
            confirmation_status: Some(level),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_when_target_reached() {
        let chain = MockChain::new();
        chain.push_status(Ok(None));
        chain.push_status(Ok(Some(status(Commitment::Processed))));
        chain.push_status(Ok(Some(status(Commitment::Finalized))));

        let outcome = poll_status(&chain, sig(), 1_000, &policy()).await;
        assert_eq!(
            outcome,
            SubmissionOutcome::Confirmed {
                signature: sig(),
                commitment: Commitment::Finalized
            }
        );
        assert_eq!(chain.calls("signature_status"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_as_unknown_with_last_seen() {
        let chain = MockChain::new();
        chain.set_default_status(Some(status(Commitment::Processed)));

        let outcome = poll_status(&chain, sig(), 1_000, &policy()).await;
        assert_eq!(
            outcome,
            SubmissionOutcome::Unknown {
                signature: sig(),
                last_seen: Some(Commitment::Processed)
            }
        );
        // One poll per interval across the budget, plus the initial poll.
        assert_eq!(chain.calls("signature_status"), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn on_chain_error_is_rejected_and_classified() {
        let chain = MockChain::new();
        chain.push_status(Ok(Some(SignatureStatus {
            slot: 5,
            err: Some(TransactionError::InstructionError(
                0,
                InstructionError::Custom(1),
            )),
            confirmation_status: Some(Commitment::Confirmed),
        })));

        match poll_status(&chain, sig(), 1_000, &policy()).await {
            SubmissionOutcome::Rejected { kind, .. } => {
                assert_eq!(kind, FailureKind::InsufficientFunds)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn absent_past_expiry_height_is_hash_expiry() {
        let chain = MockChain::new();
        chain.set_default_status(None);
        chain.push_block_height(Ok(900));
        chain.push_block_height(Ok(1_001));
        chain.push_block_height(Ok(1_002));

        match poll_status(&chain, sig(), 1_000, &policy()).await {
            SubmissionOutcome::Rejected { kind, .. } => assert_eq!(kind, FailureKind::HashExpiry),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(chain.calls("block_height"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_recheck_waits_one_interval() {
        let chain = MockChain::new();
        chain.set_default_status(None);
        chain.push_block_height(Ok(1_001));
        chain.push_block_height(Ok(1_002));
        let started = Instant::now();

        let outcome = poll_status(&chain, sig(), 1_000, &policy()).await;

        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected {
                kind: FailureKind::HashExpiry,
                ..
            }
        ));
        assert_eq!(chain.calls("signature_status"), 2);
        assert!(started.elapsed() >= policy().interval);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_budget_does_not_overflow() {
        let chain = MockChain::new();
        chain.push_status(Ok(None));
        chain.push_status(Ok(Some(status(Commitment::Confirmed))));
        let policy = PollPolicy {
            timeout: Duration::MAX,
            ..policy()
        };

        let outcome = poll_status(&chain, sig(), 1_000, &policy).await;
        assert!(matches!(outcome, SubmissionOutcome::Confirmed { .. }));
        assert_eq!(chain.calls("signature_status"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn landing_after_suspected_expiry_still_confirms() {
        let chain = MockChain::new();
        chain.push_status(Ok(None));
        chain.push_status(Ok(Some(status(Commitment::Confirmed))));
        chain.push_block_height(Ok(1_001));

        let outcome = poll_status(&chain, sig(), 1_000, &policy()).await;
        assert!(matches!(outcome, SubmissionOutcome::Confirmed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_do_not_stop_polling() {
        let chain = MockChain::new();
        chain.push_status(Err(ClientError::Network("connection reset".into())));
        chain.push_status(Err(ClientError::Network("connection reset".into())));
        chain.push_status(Ok(Some(status(Commitment::Confirmed))));

        let outcome = poll_status(&chain, sig(), 1_000, &policy()).await;
        assert!(matches!(outcome, SubmissionOutcome::Confirmed { .. }));
        assert_eq!(chain.calls("signature_status"), 3);
    }
}
