//! Mint submission on the destination network.

use alloy_primitives::{Bytes, TxHash};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::chain::NetworkConfig;
use crate::config::{ConfirmationConfig, RetryPolicy};
use crate::error::Result;
use crate::protocol::MessageHeader;
use crate::spans;
use crate::submission::{wait_for_confirmation, with_retry, SubmissionQueue};
use crate::traits::{ChainClient, Clock, TxReceipt};

/// What [`MintSubmitter::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintSubmission {
    /// A new `receiveMessage` transaction was sent.
    Submitted(TxHash),
    /// The caller already held a hash; nothing was sent.
    AlreadySubmitted(TxHash),
    /// The destination contract has already consumed the message nonce, so
    /// the funds were minted by an earlier attempt or by a third party.
    AlreadyReceived,
}

impl MintSubmission {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Submitted(tx_hash) | Self::AlreadySubmitted(tx_hash) => Some(*tx_hash),
            Self::AlreadyReceived => None,
        }
    }
}

/// Result of [`MintSubmitter::mint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome {
    /// `None` when the message had already been received
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
}

#[derive(Debug)]
pub struct MintSubmitter<C> {
    clock: C,
    queue: Arc<SubmissionQueue>,
    retry: RetryPolicy,
    confirmation: ConfirmationConfig,
}

impl<C: Clock> MintSubmitter<C> {
    pub fn new(
        clock: C,
        queue: Arc<SubmissionQueue>,
        retry: RetryPolicy,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            clock,
            queue,
            retry,
            confirmation,
        }
    }

    /// Submits `receiveMessage(message, attestation)` unless a hash is
    /// already known or the message nonce has been used on chain.
    pub async fn submit(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        message: &Bytes,
        attestation: &Bytes,
        existing: Option<TxHash>,
    ) -> Result<MintSubmission> {
        if let Some(tx_hash) = existing {
            info!(tx_hash = %tx_hash, event = "mint_already_submitted");
            return Ok(MintSubmission::AlreadySubmitted(tx_hash));
        }

        if self.is_received(client, network, message).await? {
            warn!(event = "mint_message_already_received");
            return Ok(MintSubmission::AlreadyReceived);
        }

        let sender = client.sender();
        async {
            with_retry(&self.clock, &self.retry, "submit_mint", move || async move {
                let _slot = self.queue.acquire(network.network_id, sender).await;
                client
                    .submit_mint(network.mint_contract, message.clone(), attestation.clone())
                    .await
            })
            .await
            .map(|tx_hash| {
                info!(tx_hash = %tx_hash, event = "mint_submitted");
                MintSubmission::Submitted(tx_hash)
            })
        }
        .instrument(spans::mint(network.network_id, message.len(), attestation.len()))
        .await
    }

    /// Whether the destination contract has consumed the message nonce.
    ///
    /// Messages without an assigned nonce cannot be checked and report
    /// `false`.
    pub async fn is_received(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        message: &Bytes,
    ) -> Result<bool> {
        let Some(nonce) = MessageHeader::decode(message).and_then(|h| h.assigned_nonce()) else {
            warn!(event = "mint_message_nonce_unavailable");
            return Ok(false);
        };

        let received = with_retry(&self.clock, &self.retry, "is_message_received", || {
            client.is_message_received(network.mint_contract, nonce)
        })
        .await?;
        debug!(nonce = %nonce, received = received, event = "mint_nonce_checked");
        Ok(received)
    }

    /// Waits for the mint to be mined. Reverts are not retried.
    pub async fn confirm(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        tx_hash: TxHash,
    ) -> Result<TxReceipt> {
        with_retry(&self.clock, &self.retry, "confirm_mint", || {
            wait_for_confirmation(
                client,
                &self.clock,
                network.network_id,
                tx_hash,
                &self.confirmation,
            )
        })
        .await
    }

    /// [`MintSubmitter::submit`] followed by [`MintSubmitter::confirm`].
    pub async fn mint(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        message: &Bytes,
        attestation: &Bytes,
        existing: Option<TxHash>,
    ) -> Result<MintOutcome> {
        match self
            .submit(client, network, message, attestation, existing)
            .await?
            .tx_hash()
        {
            Some(tx_hash) => {
                let receipt = self.confirm(client, network, tx_hash).await?;
                Ok(MintOutcome {
                    tx_hash: Some(tx_hash),
                    block_number: receipt.block_number,
                })
            }
            None => Ok(MintOutcome {
                tx_hash: None,
                block_number: None,
            }),
        }
    }
}
