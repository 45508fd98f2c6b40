//! Transaction submission plumbing shared by approve, burn and mint.
//!
//! - [`SubmissionQueue`] serializes sends per (network, account) so
//!   concurrent transfers from one account never race on the nonce.
//! - [`wait_for_confirmation`] polls for a receipt until it appears or the
//!   confirmation timeout elapses.
//! - [`with_retry`] re-runs an operation with exponential backoff while its
//!   error is retryable.

use alloy_chains::NamedChain;
use alloy_primitives::{Address, TxHash};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn, Instrument};

use crate::config::{ConfirmationConfig, RetryPolicy};
use crate::error::{Result, TransferError};
use crate::spans;
use crate::traits::{ChainClient, Clock, TxReceipt};

/// One lock per (network, account) pair, held for the duration of a send.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    slots: Mutex<HashMap<(NamedChain, Address), Arc<Mutex<()>>>>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive use of `account` on `network`.
    pub async fn acquire(&self, network: NamedChain, account: Address) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry((network, account)).or_default().clone()
        };
        slot.lock_owned().await
    }
}

/// Polls for the receipt of `tx_hash` until it is mined.
///
/// A reverted receipt is an [`TransferError::UnrecoverableSubmission`]. If no
/// receipt shows up within `config.timeout` the result is a retryable
/// [`TransferError::ConfirmationTimeout`]; the transaction may still land, so
/// callers re-check the same hash rather than resubmitting.
pub async fn wait_for_confirmation<C>(
    client: &dyn ChainClient,
    clock: &C,
    network: NamedChain,
    tx_hash: TxHash,
    config: &ConfirmationConfig,
) -> Result<TxReceipt>
where
    C: Clock + ?Sized,
{
    async {
        let started = clock.now();

        loop {
            match client.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    debug!(
                        block_number = ?receipt.block_number,
                        event = "transaction_confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(Some(_)) => {
                    spans::record_error_with_context(
                        "UnrecoverableSubmission",
                        "transaction reverted",
                        None,
                    );
                    return Err(TransferError::UnrecoverableSubmission {
                        reason: format!("transaction {tx_hash} reverted"),
                    });
                }
                Ok(None) => debug!(event = "transaction_pending"),
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, event = "receipt_lookup_failed");
                }
                Err(e) => return Err(e),
            }

            let waited = clock.now().saturating_duration_since(started);
            if waited >= config.timeout {
                return Err(TransferError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                });
            }

            clock
                .sleep(config.poll_interval.min(config.timeout - waited))
                .await;
        }
    }
    .instrument(spans::wait_for_confirmation(tx_hash, network))
    .await
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` is reached.
pub async fn with_retry<C, T, F, Fut>(
    clock: &C,
    policy: &RetryPolicy,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    event = "operation_retry_scheduled"
                );
                clock.sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
