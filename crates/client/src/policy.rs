//! Error escalation policy.

use tracing::error;

/// How recoverable errors are treated across the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log recoverable errors and keep running (steady-state load
    /// generation).
    #[default]
    Lenient,
    /// Upgrade recoverable errors to process exit (fail-fast CI runs).
    Strict,
}

impl FailurePolicy {
    /// Derive the policy from the config flag.
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            FailurePolicy::Strict
        } else {
            FailurePolicy::Lenient
        }
    }

    /// Terminate the process when running strict. Call after logging the
    /// error itself.
    pub fn escalate(self) {
        if self == FailurePolicy::Strict {
            error!("strict mode: exiting on recoverable error");
            std::process::exit(1);
        }
    }
}
