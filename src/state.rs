// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{Commitment, Pubkey};
use crate::config::WithdrawalConfig;
use crate::custody::PoolCredential;
use crate::withdrawal::{AdmissionGate, WithdrawalJournal, WithdrawalOrchestrator};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pubkey,
    pub chain: Arc<dyn ChainClient>,
    pub gate: Arc<dyn AdmissionGate>,
    pub journal: Arc<WithdrawalJournal>,
    pub orchestrator: Arc<WithdrawalOrchestrator>,
    /// Tracks detached withdrawal tasks so shutdown can wait for them.
    pub tasks: TaskTracker,
    /// Commitment for read-only helpers.
    pub read_commitment: Commitment,
}

impl AppState {
    pub fn new(
        credential: Arc<PoolCredential>,
        chain: Arc<dyn ChainClient>,
        gate: Arc<dyn AdmissionGate>,
        withdrawal: WithdrawalConfig,
        journal_capacity: usize,
    ) -> Self {
        let journal = Arc::new(WithdrawalJournal::new(journal_capacity));
        let read_commitment = withdrawal.blockhash_commitment;
        let pool = credential.address();
        let orchestrator = Arc::new(WithdrawalOrchestrator::new(
            chain.clone(),
            credential,
            journal.clone(),
            withdrawal,
        ));

        Self {
            pool,
            chain,
            gate,
            journal,
            orchestrator,
            tasks: TaskTracker::new(),
            read_commitment,
        }
    }
}
