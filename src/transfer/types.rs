use alloy_primitives::{keccak256, TxHash, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Wall-clock instant in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_unix_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_unix_millis(self) -> u64 {
        self.0
    }

    /// Current system time. Clocks before the epoch read as zero.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Local identifier assigned by the orchestrator when a transfer is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TransferId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Protocol-level identifier of a burn.
///
/// Derived from the burn receipt, never generated locally. Source-chain v2
/// messages carry a zero nonce, so two burns with the same sender, amount,
/// recipient and fee emit identical bytes; the identifier therefore also
/// commits to the burn transaction and the log's position in its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferIdentifier(B256);

impl TransferIdentifier {
    pub const fn new(hash: B256) -> Self {
        Self(hash)
    }

    /// `keccak256(burn_tx_hash ‖ log_index ‖ message)` with `log_index` as a
    /// big-endian u64.
    pub fn derive(burn_tx_hash: TxHash, log_index: u64, message: &[u8]) -> Self {
        let mut preimage = Vec::with_capacity(40 + message.len());
        preimage.extend_from_slice(burn_tx_hash.as_slice());
        preimage.extend_from_slice(&log_index.to_be_bytes());
        preimage.extend_from_slice(message);
        Self(keccak256(preimage))
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for TransferIdentifier {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

impl fmt::Display for TransferIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
