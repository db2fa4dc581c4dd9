// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory journal of recent withdrawals.
//!
//! Every admitted withdrawal gets a record that follows it through the
//! pipeline, so its last observed state stays retrievable after the caller
//! disconnects. The journal also owns reference-tag claims: a tag belongs to
//! at most one withdrawal that has not failed.
//!
//! Both maps are LRU-bounded. Claims older than the newest `capacity`
//! withdrawals are forgotten.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::orchestrator::WithdrawalState;
use crate::blockchain::types::Commitment;

/// Snapshot of one withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRecord {
    pub request_id: Uuid,
    pub recipient: String,
    pub lamports: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub state: WithdrawalState,
    /// Transactions built so far (1 + rebuilds).
    pub attempts: u32,
    /// Signature of the latest transaction built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<Commitment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WithdrawalRecord {
    pub fn new(request_id: Uuid, recipient: String, lamports: u64, reference: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            request_id,
            recipient,
            lamports,
            reference,
            state: WithdrawalState::Validating,
            attempts: 0,
            signature: None,
            commitment: None,
            error: None,
            error_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The tag is held by another withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTaken {
    pub holder: Uuid,
}

struct Inner {
    records: LruCache<Uuid, WithdrawalRecord>,
    references: LruCache<String, Uuid>,
}

/// Bounded record store plus reference-tag claims.
pub struct WithdrawalJournal {
    inner: Mutex<Inner>,
}

impl WithdrawalJournal {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                records: LruCache::new(capacity),
                references: LruCache::new(capacity),
            }),
        }
    }

    /// Claim `reference` for `request_id`.
    ///
    /// A tag held by a failed withdrawal is handed over.
    pub fn claim_reference(&self, reference: &str, request_id: Uuid) -> Result<(), ReferenceTaken> {
        let mut inner = self.lock();
        if let Some(holder) = inner.references.get(reference).copied() {
            let released = inner
                .records
                .peek(&holder)
                .map(|r| r.state == WithdrawalState::Failed)
                .unwrap_or(false);
            if holder != request_id && !released {
                return Err(ReferenceTaken { holder });
            }
        }
        inner.references.put(reference.to_string(), request_id);
        Ok(())
    }

    /// Drop `request_id`'s claim on `reference`.
    pub fn release_reference(&self, reference: &str, request_id: Uuid) {
        let mut inner = self.lock();
        if inner.references.peek(reference) == Some(&request_id) {
            inner.references.pop(reference);
        }
    }

    pub fn insert(&self, record: WithdrawalRecord) {
        self.lock().records.put(record.request_id, record);
    }

    /// Apply `f` to the record for `request_id`, if still held.
    pub fn update<F>(&self, request_id: Uuid, f: F)
    where
        F: FnOnce(&mut WithdrawalRecord),
    {
        let mut inner = self.lock();
        if let Some(record) = inner.records.get_mut(&request_id) {
            f(record);
            record.updated_at = Utc::now();
        }
    }

    pub fn get(&self, request_id: &Uuid) -> Option<WithdrawalRecord> {
        self.lock().records.peek(request_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
