//! Waiting for the service to come back after an update.
//!
//! One health probe per interval, no backoff.

use crate::client::HealthCheck;
use crate::constants::{DEFAULT_MAX_WAIT_SECS, RECOVERY_HEARTBEAT_EVERY, RECOVERY_POLL_INTERVAL};
use std::time::Duration;
use tracing::debug;

/// How long and how often to probe for recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Maximum number of probes; with the default interval this is seconds.
    pub max_wait_secs: u64,
    /// Sleep before each probe.
    pub interval: Duration,
    /// Print a heartbeat after this many probes (0 disables it).
    pub heartbeat_every: u64,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::with_max_wait(DEFAULT_MAX_WAIT_SECS)
    }
}

impl RecoveryPolicy {
    /// Default interval and heartbeat with the given budget.
    #[must_use]
    pub const fn with_max_wait(max_wait_secs: u64) -> Self {
        Self {
            max_wait_secs,
            interval: RECOVERY_POLL_INTERVAL,
            heartbeat_every: RECOVERY_HEARTBEAT_EVERY,
        }
    }
}

/// Result of [`wait_for_recovery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The service answered healthy on probe number `attempts`.
    Recovered {
        /// Probes sent, the successful one included
        attempts: u64,
    },
    /// Every probe failed.
    TimedOut {
        /// Probes sent
        attempts: u64,
    },
}

impl RecoveryOutcome {
    /// Number of health probes that were sent.
    #[must_use]
    pub const fn attempts(&self) -> u64 {
        match self {
            Self::Recovered { attempts } | Self::TimedOut { attempts } => *attempts,
        }
    }
}

/// Probe `health` until it reports healthy or the budget is used up.
///
/// Sleeps one interval before every probe, sends at most
/// `policy.max_wait_secs` probes and stops at the first healthy answer.
pub async fn wait_for_recovery<H: HealthCheck>(
    health: &H,
    policy: &RecoveryPolicy,
) -> RecoveryOutcome {
    for attempt in 1..=policy.max_wait_secs {
        tokio::time::sleep(policy.interval).await;

        if health.is_healthy().await {
            debug!("Service healthy after {} probe(s)", attempt);
            return RecoveryOutcome::Recovered { attempts: attempt };
        }

        if policy.heartbeat_every > 0 && attempt % policy.heartbeat_every == 0 {
            let waited = policy.interval.saturating_mul(u32::try_from(attempt).unwrap_or(u32::MAX));
            println!("Waited {} seconds...", waited.as_secs());
        }
    }

    RecoveryOutcome::TimedOut {
        attempts: policy.max_wait_secs,
    }
}
