//! Per-provider rate limiting and circuit breaking.
//!
//! The PAF and geocoding providers are metered APIs, so every provider in the
//! resolver chain sits behind a token bucket and a consecutive-failure
//! breaker. A guard rejection is reported like a transport failure and the
//! resolver moves on to the next provider.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Limits applied to a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Sustained request budget; `0` disables the limiter.
    pub requests_per_minute: u32,
    /// Consecutive failures before the breaker opens; `0` disables the breaker.
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            requests_per_minute: 120,
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("circuit open after repeated failures")]
    CircuitOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { until: Instant },
    /// One trial call admitted; further calls wait for its outcome.
    HalfOpen { trial_started: Instant },
}

#[derive(Debug)]
struct GuardState {
    tokens: f64,
    last_refill: Instant,
    circuit: CircuitState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct ProviderGuard {
    name: &'static str,
    policy: GuardPolicy,
    state: Mutex<GuardState>,
}

impl ProviderGuard {
    pub fn new(name: &'static str, policy: GuardPolicy) -> Self {
        Self {
            name,
            policy,
            state: Mutex::new(GuardState {
                tokens: f64::from(policy.requests_per_minute),
                last_refill: Instant::now(),
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Reserve capacity for one call, or explain why the call must be skipped.
    pub fn admit(&self) -> Result<(), GuardRejection> {
        let now = Instant::now();
        let mut state = self.state.lock().expect("guard mutex poisoned");

        match state.circuit {
            CircuitState::Closed => {}
            CircuitState::Open { until } if now < until => {
                return Err(GuardRejection::CircuitOpen);
            }
            CircuitState::Open { .. } => {
                info!(provider = self.name, "circuit half-open, admitting trial call");
                state.circuit = CircuitState::HalfOpen { trial_started: now };
            }
            CircuitState::HalfOpen { trial_started } => {
                // A trial call that never reported back does not block forever.
                if now.duration_since(trial_started) < self.policy.cooldown {
                    return Err(GuardRejection::CircuitOpen);
                }
                state.circuit = CircuitState::HalfOpen { trial_started: now };
            }
        }

        if self.policy.requests_per_minute == 0 {
            return Ok(());
        }

        let capacity = f64::from(self.policy.requests_per_minute);
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * capacity / 60.0).min(capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            Err(GuardRejection::RateLimited)
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().expect("guard mutex poisoned");
        if state.circuit != CircuitState::Closed {
            info!(provider = self.name, "circuit closed");
        }
        state.circuit = CircuitState::Closed;
        state.consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        if self.policy.failure_threshold == 0 {
            return;
        }

        let now = Instant::now();
        let mut state = self.state.lock().expect("guard mutex poisoned");
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        let trip = matches!(state.circuit, CircuitState::HalfOpen { .. })
            || state.consecutive_failures >= self.policy.failure_threshold;
        if trip {
            warn!(
                provider = self.name,
                failures = state.consecutive_failures,
                cooldown_secs = self.policy.cooldown.as_secs(),
                "circuit opened, pausing provider"
            );
            state.circuit = CircuitState::Open {
                until: now + self.policy.cooldown,
            };
        }
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().expect("guard mutex poisoned");
        !matches!(state.circuit, CircuitState::Closed)
    }
}
