use alloy_primitives::{Bytes, TxHash};
use serde::{Deserialize, Serialize};

use super::{Timestamp, TransferId, TransferIdentifier, TransferRequest, TransferState};
use crate::error::{ErrorKind, Result, TransferError};

/// Persisted description of why a transfer stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    /// State the transfer was in when the error occurred
    pub failed_in: TransferState,
}

impl TransferFailure {
    pub fn from_error(error: &TransferError, failed_in: TransferState) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
            failed_in,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: TransferState,
    pub to: TransferState,
    pub at: Timestamp,
}

/// The authoritative state of one transfer.
///
/// Only the orchestrator mutates records. Transaction hashes and the
/// protocol identifier are write-once: setting a different value than the one
/// already stored is an error, setting the same value again is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    id: TransferId,
    request: TransferRequest,
    state: TransferState,
    approve_tx_hash: Option<TxHash>,
    burn_tx_hash: Option<TxHash>,
    transfer_identifier: Option<TransferIdentifier>,
    attested_message: Option<Bytes>,
    attested_signature: Option<Bytes>,
    mint_tx_hash: Option<TxHash>,
    error: Option<TransferFailure>,
    started_at: Timestamp,
    last_updated_at: Timestamp,
    state_entered_at: Timestamp,
    deadline: Timestamp,
    burn_submission_started: bool,
    mint_submission_started: bool,
    transitions: Vec<Transition>,
    resumptions: u32,
}

impl TransferRecord {
    pub(crate) fn new(
        id: TransferId,
        request: TransferRequest,
        now: Timestamp,
        deadline: Timestamp,
    ) -> Self {
        Self {
            id,
            request,
            state: TransferState::Idle,
            approve_tx_hash: None,
            burn_tx_hash: None,
            transfer_identifier: None,
            attested_message: None,
            attested_signature: None,
            mint_tx_hash: None,
            error: None,
            started_at: now,
            last_updated_at: now,
            state_entered_at: now,
            deadline,
            burn_submission_started: false,
            mint_submission_started: false,
            transitions: Vec::new(),
            resumptions: 0,
        }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn request(&self) -> &TransferRequest {
        &self.request
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn approve_tx_hash(&self) -> Option<TxHash> {
        self.approve_tx_hash
    }

    pub fn burn_tx_hash(&self) -> Option<TxHash> {
        self.burn_tx_hash
    }

    pub fn transfer_identifier(&self) -> Option<TransferIdentifier> {
        self.transfer_identifier
    }

    /// Attested message and signature, once both are known.
    pub fn attestation(&self) -> Option<(&Bytes, &Bytes)> {
        self.attested_message
            .as_ref()
            .zip(self.attested_signature.as_ref())
    }

    pub fn mint_tx_hash(&self) -> Option<TxHash> {
        self.mint_tx_hash
    }

    /// Most recent error, including non-fatal ones such as the reason a
    /// record needs reconciliation.
    pub fn error(&self) -> Option<&TransferFailure> {
        self.error.as_ref()
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn last_updated_at(&self) -> Timestamp {
        self.last_updated_at
    }

    pub fn state_entered_at(&self) -> Timestamp {
        self.state_entered_at
    }

    /// Instant after which work in the current state is abandoned.
    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    pub fn burn_submission_started(&self) -> bool {
        self.burn_submission_started
    }

    pub fn mint_submission_started(&self) -> bool {
        self.mint_submission_started
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn resumptions(&self) -> u32 {
        self.resumptions
    }

    pub fn is_deadline_exceeded(&self, now: Timestamp) -> bool {
        now > self.deadline
    }

    pub(crate) fn transition_to(
        &mut self,
        next: TransferState,
        now: Timestamp,
        deadline: Timestamp,
    ) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(TransferError::InvalidTransition(format!(
                "{} -> {next} for transfer {}",
                self.state, self.id
            )));
        }

        self.transitions.push(Transition {
            from: self.state,
            to: next,
            at: now,
        });
        self.state = next;
        self.state_entered_at = now;
        self.last_updated_at = now;
        self.deadline = deadline;
        Ok(())
    }

    /// Moves the record to `Failed`, remembering where it failed.
    pub(crate) fn fail(&mut self, error: &TransferError, now: Timestamp) -> Result<()> {
        let failure = TransferFailure::from_error(error, self.state);
        self.transition_to(TransferState::Failed, now, now)?;
        self.error = Some(failure);
        Ok(())
    }

    /// Records a non-fatal error without changing state.
    pub(crate) fn note_error(&mut self, error: &TransferError, now: Timestamp) {
        self.error = Some(TransferFailure::from_error(error, self.state));
        self.last_updated_at = now;
    }

    /// Reopens a retryable failure in the state it failed in.
    pub(crate) fn reopen(
        &mut self,
        now: Timestamp,
        deadline: impl FnOnce(TransferState) -> Timestamp,
    ) -> Result<TransferState> {
        let failed_in = match (&self.state, &self.error) {
            (TransferState::Failed, Some(failure)) if failure.retryable => failure.failed_in,
            (TransferState::Failed, _) => {
                return Err(TransferError::InvalidTransition(format!(
                    "transfer {} failed with a non-retryable error",
                    self.id
                )))
            }
            (state, _) => {
                return Err(TransferError::InvalidTransition(format!(
                    "transfer {} is {state}, not FAILED",
                    self.id
                )))
            }
        };

        self.transitions.push(Transition {
            from: TransferState::Failed,
            to: failed_in,
            at: now,
        });
        self.state = failed_in;
        self.state_entered_at = now;
        self.last_updated_at = now;
        self.deadline = deadline(failed_in);
        self.error = None;
        self.resumptions += 1;
        Ok(failed_in)
    }

    pub(crate) fn set_approve_tx_hash(&mut self, tx_hash: TxHash, now: Timestamp) {
        // Approvals are idempotent on chain, a later approval replaces the hash.
        self.approve_tx_hash = Some(tx_hash);
        self.last_updated_at = now;
    }

    pub(crate) fn set_burn_tx_hash(&mut self, tx_hash: TxHash, now: Timestamp) -> Result<()> {
        set_once(&mut self.burn_tx_hash, tx_hash, "burn transaction hash")?;
        self.last_updated_at = now;
        Ok(())
    }

    pub(crate) fn set_transfer_identifier(
        &mut self,
        identifier: TransferIdentifier,
        now: Timestamp,
    ) -> Result<()> {
        set_once(
            &mut self.transfer_identifier,
            identifier,
            "transfer identifier",
        )?;
        self.last_updated_at = now;
        Ok(())
    }

    pub(crate) fn set_attestation(
        &mut self,
        message: Bytes,
        signature: Bytes,
        now: Timestamp,
    ) -> Result<()> {
        set_once(&mut self.attested_message, message, "attested message")?;
        set_once(&mut self.attested_signature, signature, "attestation")?;
        self.last_updated_at = now;
        Ok(())
    }

    pub(crate) fn set_mint_tx_hash(&mut self, tx_hash: TxHash, now: Timestamp) -> Result<()> {
        set_once(&mut self.mint_tx_hash, tx_hash, "mint transaction hash")?;
        self.last_updated_at = now;
        Ok(())
    }

    pub(crate) fn set_burn_submission_started(&mut self, started: bool, now: Timestamp) {
        self.burn_submission_started = started;
        self.last_updated_at = now;
    }

    pub(crate) fn set_mint_submission_started(&mut self, started: bool, now: Timestamp) {
        self.mint_submission_started = started;
        self.last_updated_at = now;
    }
}

fn set_once<T: PartialEq + std::fmt::Debug>(
    slot: &mut Option<T>,
    value: T,
    what: &str,
) -> Result<()> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(existing) => Err(TransferError::InvalidTransition(format!(
            "{what} already set to {existing:?}, refusing {value:?}"
        ))),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_chains::NamedChain;
    use alloy_primitives::U256;

    fn record() -> TransferRecord {
        let request = TransferRequest::builder()
            .source_network(NamedChain::Mainnet)
            .destination_network(NamedChain::Base)
            .amount(U256::from(1u64))
            .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
            .build();
        TransferRecord::new(
            TransferId::new(),
            request,
            Timestamp::from_unix_millis(0),
            Timestamp::from_unix_millis(1_000),
        )
    }

    #[test]
    fn test_transition_records_history() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);

        record
            .transition_to(TransferState::CheckingBalance, now, now)
            .unwrap();

        assert_eq!(record.state(), TransferState::CheckingBalance);
        assert_eq!(record.state_entered_at(), now);
        assert_eq!(
            record.transitions(),
            &[Transition {
                from: TransferState::Idle,
                to: TransferState::CheckingBalance,
                at: now,
            }]
        );
    }

    #[test]
    fn test_backwards_transition_rejected() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);
        record
            .transition_to(TransferState::CheckingBalance, now, now)
            .unwrap();

        let err = record
            .transition_to(TransferState::Idle, now, now)
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidTransition(_)));
    }

    #[test]
    fn test_burn_hash_is_write_once() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);
        let hash = TxHash::repeat_byte(1);

        record.set_burn_tx_hash(hash, now).unwrap();
        record.set_burn_tx_hash(hash, now).unwrap();

        assert!(record
            .set_burn_tx_hash(TxHash::repeat_byte(2), now)
            .is_err());
        assert_eq!(record.burn_tx_hash(), Some(hash));
    }

    #[test]
    fn test_failure_serialization() {
        let failure = TransferFailure::from_error(
            &TransferError::InsufficientFunds {
                balance: U256::from(5u64),
                required: U256::from(10u64),
            },
            TransferState::CheckingBalance,
        );

        insta::assert_snapshot!(
            serde_json::to_string(&failure).unwrap(),
            @r#"{"kind":"insufficient_funds","message":"Insufficient funds: balance 5, required 10","retryable":false,"failed_in":"CHECKING_BALANCE"}"#
        );
    }

    #[test]
    fn test_failed_record_is_frozen() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);
        record.fail(&TransferError::Cancelled, now).unwrap();

        assert_eq!(record.state(), TransferState::Failed);
        assert!(record
            .transition_to(TransferState::CheckingBalance, now, now)
            .is_err());
        assert!(record.fail(&TransferError::Cancelled, now).is_err());
    }

    #[test]
    fn test_reopen_retryable_failure() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);
        record
            .transition_to(TransferState::CheckingBalance, now, now)
            .unwrap();
        record
            .fail(&TransferError::TransientNetwork("reset".into()), now)
            .unwrap();

        let later = Timestamp::from_unix_millis(50);
        let state = record
            .reopen(later, |_| Timestamp::from_unix_millis(500))
            .unwrap();

        assert_eq!(state, TransferState::CheckingBalance);
        assert_eq!(record.state(), TransferState::CheckingBalance);
        assert_eq!(record.deadline(), Timestamp::from_unix_millis(500));
        assert_eq!(record.resumptions(), 1);
        assert!(record.error().is_none());
    }

    #[test]
    fn test_reopen_non_retryable_failure_rejected() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);
        record
            .fail(
                &TransferError::InsufficientFunds {
                    balance: U256::ZERO,
                    required: U256::from(1u64),
                },
                now,
            )
            .unwrap();

        assert!(record.reopen(now, |_| now).is_err());
        assert_eq!(record.state(), TransferState::Failed);
    }

    #[test]
    fn test_record_serde_preserves_fields() {
        let mut record = record();
        let now = Timestamp::from_unix_millis(10);
        record.set_burn_tx_hash(TxHash::repeat_byte(3), now).unwrap();
        record.set_burn_submission_started(true, now);

        let json = serde_json::to_vec(&record).unwrap();
        let decoded: TransferRecord = serde_json::from_slice(&json).unwrap();

        assert_eq!(decoded, record);
    }
}
