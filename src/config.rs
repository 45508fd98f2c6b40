//! Orchestrator configuration
//!
//! Every knob has a default suited to standard-finality mainnet transfers.
//! [`OrchestratorConfig::from_env`] overlays `CCTP_*` environment variables
//! (after loading a `.env` file if one exists).

use alloy_primitives::U256;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransferError};
use crate::protocol::FinalityThreshold;
use crate::transfer::{Timestamp, TransferState};

/// Circle Iris API environment URLs
///
/// See <https://developers.circle.com/stablecoins/cctp-apis>
pub const IRIS_API: &str = "https://iris-api.circle.com";
pub const IRIS_API_SANDBOX: &str = "https://iris-api-sandbox.circle.com";

/// CCTP v2 messages API path: `/v2/messages/{sourceDomain}?transactionHash={txHash}`
pub const MESSAGES_PATH_V2: &str = "/v2/messages/";

/// Configuration for attestation polling behavior.
///
/// # Examples
///
/// ```rust
/// use cctp_orchestrator::PollingConfig;
/// use std::time::Duration;
///
/// let config = PollingConfig::default()
///     .with_poll_interval(Duration::from_secs(30));
/// assert_eq!(config.poll_interval, Duration::from_secs(30));
///
/// let fast = PollingConfig::fast_transfer();
/// assert_eq!(fast.poll_interval, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Wait before the first poll. Attestations are never ready right after
    /// the burn confirms.
    pub initial_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
        }
    }
}

impl PollingConfig {
    /// Fast transfers are usually attested within a few seconds.
    pub fn fast_transfer() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Exponential backoff for transient chain failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay after the `attempt`-th failure (1-based).
    ///
    /// ```rust
    /// use cctp_orchestrator::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
    /// assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
    /// assert_eq!(policy.backoff_for(10), Duration::from_secs(30));
    /// ```
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// How long to wait for a submitted transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Maximum time a transfer may spend in each state.
///
/// A state's deadline is measured from the moment the record entered it,
/// not from the transfer's `started_at`. Attestation is by far the longest
/// wait, so it gets its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateBudgets {
    /// Bookkeeping hops such as `IDLE` and `APPROVED`
    pub transition: Duration,
    pub checking_balance: Duration,
    pub approving: Duration,
    pub burning: Duration,
    pub reconciliation: Duration,
    pub attestation: Duration,
    pub minting: Duration,
}

impl Default for StateBudgets {
    fn default() -> Self {
        Self {
            transition: Duration::from_secs(300),
            checking_balance: Duration::from_secs(120),
            approving: Duration::from_secs(900),
            burning: Duration::from_secs(900),
            reconciliation: Duration::from_secs(7 * 24 * 3600),
            attestation: Duration::from_secs(1800),
            minting: Duration::from_secs(900),
        }
    }
}

impl StateBudgets {
    pub fn budget_for(&self, state: TransferState) -> Duration {
        match state {
            TransferState::CheckingBalance => self.checking_balance,
            TransferState::Approving => self.approving,
            TransferState::Burning => self.burning,
            TransferState::ReconciliationRequired => self.reconciliation,
            TransferState::AwaitingAttestation => self.attestation,
            TransferState::Minting => self.minting,
            TransferState::Completed | TransferState::Failed => Duration::ZERO,
            TransferState::Idle
            | TransferState::Approved
            | TransferState::Burned
            | TransferState::Attested => self.transition,
        }
    }

    pub fn deadline_for(&self, state: TransferState, entered_at: Timestamp) -> Timestamp {
        entered_at.saturating_add(self.budget_for(state))
    }

    pub fn with_attestation(mut self, budget: Duration) -> Self {
        self.attestation = budget;
        self
    }
}

/// Everything the orchestrator needs beyond its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrchestratorConfig {
    pub polling: PollingConfig,
    pub retry: RetryPolicy,
    pub confirmation: ConfirmationConfig,
    pub budgets: StateBudgets,
    pub finality_threshold: FinalityThreshold,
    /// Upper bound on the protocol fee deducted on the destination chain
    pub max_fee: U256,
}

impl OrchestratorConfig {
    /// Fast-finality transfers with matching polling cadence.
    pub fn fast_transfer(max_fee: U256) -> Self {
        Self {
            polling: PollingConfig::fast_transfer(),
            finality_threshold: FinalityThreshold::Fast,
            max_fee,
            ..Self::default()
        }
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_budgets(mut self, budgets: StateBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// Reads overrides from the process environment.
    ///
    /// | variable                          | field                          |
    /// |-----------------------------------|--------------------------------|
    /// | `CCTP_FAST_TRANSFER`              | fast preset (`true`/`false`)   |
    /// | `CCTP_MAX_FEE`                    | `max_fee`                      |
    /// | `CCTP_POLL_INTERVAL_SECS`         | `polling.poll_interval`        |
    /// | `CCTP_POLL_INITIAL_DELAY_SECS`    | `polling.initial_delay`        |
    /// | `CCTP_ATTESTATION_TIMEOUT_SECS`   | `budgets.attestation`          |
    /// | `CCTP_CONFIRMATION_TIMEOUT_SECS`  | `confirmation.timeout`         |
    /// | `CCTP_RETRY_MAX_ATTEMPTS`         | `retry.max_attempts`           |
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OrchestratorConfig::from_env`] with an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_fee = parse::<U256>(&lookup, "CCTP_MAX_FEE")?.unwrap_or_default();
        let mut config = match parse::<bool>(&lookup, "CCTP_FAST_TRANSFER")? {
            Some(true) => Self::fast_transfer(max_fee),
            _ => Self {
                max_fee,
                ..Self::default()
            },
        };

        if let Some(secs) = parse::<u64>(&lookup, "CCTP_POLL_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(TransferError::InvalidConfig(
                    "CCTP_POLL_INTERVAL_SECS must be positive".to_string(),
                ));
            }
            config.polling.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "CCTP_POLL_INITIAL_DELAY_SECS")? {
            config.polling.initial_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "CCTP_ATTESTATION_TIMEOUT_SECS")? {
            config.budgets.attestation = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "CCTP_CONFIRMATION_TIMEOUT_SECS")? {
            config.confirmation.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse::<u32>(&lookup, "CCTP_RETRY_MAX_ATTEMPTS")? {
            config.retry = config.retry.with_max_attempts(attempts);
        }

        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TransferError::InvalidConfig(format!("{key}={raw}: {e}")))
        })
        .transpose()
}
