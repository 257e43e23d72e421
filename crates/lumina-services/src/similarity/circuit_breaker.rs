//! Circuit breaker guarding calls to the embedding service.
//!
//! `Closed` lets every call through. A host-unreachable failure opens the
//! circuit and later calls fail fast without touching the network. With a
//! recheck interval configured, the first call after the interval moves the
//! circuit to `HalfOpen` and is let through as a single probe; its outcome
//! closes or reopens the circuit. Without one the circuit stays open for the
//! life of the process.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerConfig {
    /// `None` keeps a tripped circuit open.
    pub recheck_after: Option<Duration>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    trips: u64,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                opened_at: None,
                probe_in_flight: false,
                trips: 0,
            }),
        }
    }

    /// Breaker that never rechecks once tripped.
    pub fn sticky(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Times the circuit has opened.
    pub fn trips(&self) -> u64 {
        self.inner.lock().trips
    }

    /// Whether a call may go out now. Must be followed by `record_success`
    /// or `record_failure` when it returns `true`.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recheck_due = match (self.config.recheck_after, inner.opened_at) {
                    (Some(after), Some(opened_at)) => opened_at.elapsed() >= after,
                    _ => false,
                };
                if recheck_due {
                    tracing::info!(breaker = %self.name, "Circuit half-open, probing service");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                }
                recheck_due
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Give back a permit from `allow_request` when no call was made.
    pub fn abandon_request(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(breaker = %self.name, "Circuit closed, service reachable again");
        }
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Open {
            inner.trips += 1;
            tracing::warn!(
                breaker = %self.name,
                recheck_after_secs = ?self.config.recheck_after.map(|d| d.as_secs()),
                "Circuit opened, service marked unavailable"
            );
        }
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.probe_in_flight = false;
    }
}
