use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a transfer.
///
/// Variants are declared in lifecycle order and the derived `Ord` is that
/// order, so a record's state only ever increases. `Failed` sorts last and is
/// reachable from every non-terminal state.
///
/// ```text
/// Idle → CheckingBalance → [Approving → Approved] → Burning
///      → [ReconciliationRequired] → Burned → AwaitingAttestation
///      → Attested → Minting → Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    Idle,
    CheckingBalance,
    Approving,
    Approved,
    Burning,
    /// The burn may have happened but no identifier could be derived from
    /// chain data. Waits for an operator.
    ReconciliationRequired,
    Burned,
    AwaitingAttestation,
    Attested,
    Minting,
    Completed,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// States in which no funds have left the sender yet.
    pub fn is_cancellable(self) -> bool {
        self <= Self::Approved
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use TransferState::*;

        if self.is_terminal() {
            return false;
        }

        matches!(
            (self, next),
            (_, Failed)
                | (Idle, CheckingBalance)
                | (CheckingBalance, Approving)
                | (CheckingBalance, Burning)
                | (Approving, Approved)
                | (Approved, Burning)
                | (Burning, Burned)
                | (Burning, ReconciliationRequired)
                | (ReconciliationRequired, Burned)
                | (Burned, AwaitingAttestation)
                | (AwaitingAttestation, Attested)
                | (Attested, Minting)
                | (Minting, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::CheckingBalance => "CHECKING_BALANCE",
            Self::Approving => "APPROVING",
            Self::Approved => "APPROVED",
            Self::Burning => "BURNING",
            Self::ReconciliationRequired => "RECONCILIATION_REQUIRED",
            Self::Burned => "BURNED",
            Self::AwaitingAttestation => "AWAITING_ATTESTATION",
            Self::Attested => "ATTESTED",
            Self::Minting => "MINTING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
