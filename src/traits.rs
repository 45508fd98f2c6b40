//! Trait seams between the orchestrator and the outside world.
//!
//! Chains, the attestation service, wall-clock time, and the record store are
//! all reached through these traits, so the state machine can be exercised
//! against the fakes in [`crate::testing`] without a node or network access.
//!
//! # Example: a read-only chain stub
//!
//! ```rust,ignore
//! use cctp_orchestrator::traits::ChainClient;
//!
//! struct StaticBalances { sender: Address, balance: U256 }
//!
//! #[async_trait::async_trait]
//! impl ChainClient for StaticBalances {
//!     fn sender(&self) -> Address { self.sender }
//!     async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256> {
//!         Ok(self.balance)
//!     }
//!     // ...
//! }
//! ```

use alloy_primitives::{Address, Bytes, FixedBytes, Log, TxHash, U256};
use async_trait::async_trait;
use std::time::Duration;

use crate::burn::BurnCall;
use crate::error::Result;
use crate::protocol::{DomainId, MessagesResponse};
use crate::transfer::{Timestamp, TransferId, TransferRecord};

/// Receipt fields the orchestrator relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` if the transaction reverted
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Access to one network on behalf of one signing account.
///
/// The signer is an opaque capability of the implementation: every
/// `submit_*` call is signed and sent as [`ChainClient::sender`]. Submissions
/// return as soon as the node accepts the transaction; confirmation is
/// observed separately through [`ChainClient::transaction_receipt`].
///
/// # Test Scenarios
///
/// Fakes of this trait cover:
/// - Transient RPC failures on reads and sends
/// - Reverted transactions
/// - Approvals that confirm without moving the allowance
/// - Burn receipts with missing or renamed `MessageSent` events
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Account that signs transactions submitted through this client.
    fn sender(&self) -> Address;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn submit_approve(&self, token: Address, spender: Address, amount: U256)
        -> Result<TxHash>;

    async fn submit_burn(&self, burn_contract: Address, call: &BurnCall) -> Result<TxHash>;

    async fn submit_mint(
        &self,
        mint_contract: Address,
        message: Bytes,
        attestation: Bytes,
    ) -> Result<TxHash>;

    /// Whether the mint contract has already consumed the message nonce.
    async fn is_message_received(
        &self,
        mint_contract: Address,
        nonce: FixedBytes<32>,
    ) -> Result<bool>;

    /// Returns `None` while the transaction is not yet mined.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>>;
}

/// Attestation retrieval from Circle's Iris API.
///
/// Implementations map HTTP outcomes onto errors:
/// - 404 → [`TransferError::AttestationNotFound`](crate::TransferError::AttestationNotFound)
/// - 429 → [`TransferError::RateLimited`](crate::TransferError::RateLimited)
/// - other 4xx → [`TransferError::AttestationRejected`](crate::TransferError::AttestationRejected)
/// - 5xx and I/O failures → retryable network errors
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    async fn get_messages(
        &self,
        source_domain: DomainId,
        tx_hash: TxHash,
    ) -> Result<MessagesResponse>;
}

/// Time source and sleep.
///
/// Timestamps are persisted on transfer records, so the clock reports wall
/// time rather than a monotonic instant. Fakes advance virtual time on
/// `sleep`, which lets polling loops and deadlines run instantly in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> Timestamp;
}

/// Durable keyed storage for transfer records.
///
/// `save` must be durable when it returns: the orchestrator persists
/// transaction hashes immediately after submission and relies on them to
/// avoid resubmitting after a restart.
#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn load(&self, id: TransferId) -> Result<Option<TransferRecord>>;

    async fn save(&self, record: &TransferRecord) -> Result<()>;

    async fn list(&self) -> Result<Vec<TransferRecord>>;
}
