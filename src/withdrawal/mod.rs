// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Withdrawal pipeline.
//!
//! - `request` - wire type and validation
//! - `gate` - process-wide rate admission
//! - `journal` - recent outcomes and reference-tag claims
//! - `orchestrator` - build, submit, confirm and retry

pub mod gate;
pub mod journal;
pub mod orchestrator;
pub mod request;

pub use gate::{Admission, AdmissionGate, RateGate};
pub use journal::{WithdrawalJournal, WithdrawalRecord};
pub use orchestrator::{
    Finality, WithdrawalError, WithdrawalOrchestrator, WithdrawalOutcome, WithdrawalState,
};
pub use request::{ValidatedWithdrawal, ValidationError, WithdrawalRequest};
