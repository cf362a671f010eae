use failsafe::{
    backoff::{self, Exponential},
    failure_policy::{self, ConsecutiveFailures},
    Config, StateMachine,
};
use std::time::Duration;

/// Circuit breaker shared by the geocoding and zone-search calls of one provider.
pub type UpstreamBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for maps provider calls to prevent hammering a failing upstream.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, requests pass through.
/// - **OPEN**: Too many failures, requests fail fast.
/// - **HALF_OPEN**: Testing if service recovered.
///
/// The returned breaker is cheap to clone; clones share state.
pub fn create_upstream_circuit_breaker() -> UpstreamBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
