//! Per-provider circuit breaker.
//!
//! After `failure_threshold` consecutive upstream failures the provider is
//! skipped for `cooldown`; the first call after that is a single probe whose
//! outcome closes or reopens the circuit.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    Probing,
}

/// Thread-safe breaker shared by every request hitting one upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    /// `Ok` when a call may go out; otherwise the time left before the next probe.
    pub fn check(&self) -> Result<(), Duration> {
        let mut phase = self.lock();
        match *phase {
            Phase::Closed { .. } | Phase::Probing => Ok(()),
            Phase::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.config.cooldown {
                    *phase = Phase::Probing;
                    info!(provider = self.name, "circuit half-open, probing upstream");
                    Ok(())
                } else {
                    Err(self.config.cooldown - elapsed)
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut phase = self.lock();
        if matches!(*phase, Phase::Probing) {
            info!(provider = self.name, "circuit closed");
        }
        *phase = Phase::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut phase = self.lock();
        let failures = match *phase {
            Phase::Closed { failures } => failures.saturating_add(1),
            Phase::Probing => self.config.failure_threshold,
            Phase::Open { .. } => return,
        };

        if failures >= self.config.failure_threshold {
            warn!(
                provider = self.name,
                failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "circuit opened"
            );
            *phase = Phase::Open {
                since: Instant::now(),
            };
        } else {
            *phase = Phase::Closed { failures };
        }
    }

    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::Probing => CircuitState::HalfOpen,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
