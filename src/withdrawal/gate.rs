// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide rate admission for withdrawals.
//!
//! The gate bounds how many withdrawal attempts are accepted per window,
//! regardless of who sends them. It guards against runaway automated
//! draining; it is not a per-caller quota.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::config::GateConfig;

/// Result of asking the gate for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Rejected; capacity for one more request frees up after `retry_after`.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Admission control for withdrawal attempts.
///
/// `admit` must test and count atomically; implementations backed by a
/// shared store can replace [`RateGate`] without touching callers.
pub trait AdmissionGate: Send + Sync {
    fn admit(&self) -> Admission;
}

/// GCRA limiter admitting a burst of `max_requests`, replenished evenly
/// across `window`.
pub struct RateGate {
    limiter: DefaultDirectRateLimiter,
    clock: DefaultClock,
}

impl RateGate {
    pub fn new(config: GateConfig) -> Self {
        let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let period = (config.window / burst.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::direct(quota),
            clock: DefaultClock::default(),
        }
    }
}

impl AdmissionGate for RateGate {
    fn admit(&self) -> Admission {
        match self.limiter.check() {
            Ok(()) => Admission::Admitted,
            Err(not_until) => Admission::Denied {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }
}
