//! Burn submission and identifier extraction.

mod extract;

pub use extract::{
    ExtractionContext, ExtractorChain, IdentifierExtractor, MessagePayloadScan,
    MessageSentExtractor,
};

use alloy_primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use bon::Builder;
use std::sync::Arc;
use tracing::{info, Instrument};

use crate::chain::NetworkConfig;
use crate::config::{ConfirmationConfig, RetryPolicy};
use crate::error::Result;
use crate::protocol::{DomainId, FinalityThreshold};
use crate::spans;
use crate::submission::{wait_for_confirmation, with_retry, SubmissionQueue};
use crate::token_ops::TokenOps;
use crate::traits::{ChainClient, Clock};
use crate::transfer::TransferIdentifier;

/// Arguments of `depositForBurn` / `depositForBurnWithHook`.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct BurnCall {
    pub amount: U256,
    pub destination_domain: DomainId,
    /// Recipient address left-padded to 32 bytes
    pub mint_recipient: FixedBytes<32>,
    pub burn_token: Address,
    /// Zero lets any account relay the mint
    #[builder(default)]
    pub destination_caller: FixedBytes<32>,
    #[builder(default)]
    pub max_fee: U256,
    #[builder(default)]
    pub min_finality_threshold: FinalityThreshold,
    pub hook_data: Option<Bytes>,
}

/// Result of a confirmed burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `None` if no strategy could derive the identifier from the receipt
    pub transfer_identifier: Option<TransferIdentifier>,
}

/// Submits burns and confirms them.
///
/// Submission and confirmation are separate steps so the caller can persist
/// the transaction hash in between.
#[derive(Debug)]
pub struct BurnSubmitter<C> {
    clock: C,
    queue: Arc<SubmissionQueue>,
    retry: RetryPolicy,
    confirmation: ConfirmationConfig,
    token_ops: TokenOps<C>,
    extractors: ExtractorChain,
}

impl<C: Clock + Clone> BurnSubmitter<C> {
    pub fn new(
        clock: C,
        queue: Arc<SubmissionQueue>,
        retry: RetryPolicy,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            token_ops: TokenOps::new(clock.clone(), queue.clone(), confirmation),
            clock,
            queue,
            retry,
            confirmation,
            extractors: ExtractorChain::default(),
        }
    }

    pub fn with_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.extractors = extractors;
        self
    }

    /// Submits the burn unless `existing` already holds its hash.
    ///
    /// A known hash is returned as is: whatever happened to that transaction
    /// is settled by [`BurnSubmitter::confirm`], never by sending another.
    ///
    /// Balance and allowance are re-read while holding the account's
    /// submission slot, so a burn never goes out against funds or allowance
    /// another transfer from the same account already spent. A consumed
    /// allowance is approved again before sending.
    pub async fn submit(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        call: &BurnCall,
        existing: Option<TxHash>,
    ) -> Result<TxHash> {
        if let Some(tx_hash) = existing {
            info!(tx_hash = %tx_hash, event = "burn_already_submitted");
            return Ok(tx_hash);
        }

        let sender = client.sender();
        async {
            with_retry(&self.clock, &self.retry, "submit_burn", move || async move {
                let _slot = self.queue.acquire(network.network_id, sender).await;
                self.token_ops
                    .ensure_spendable(client, network, call.amount)
                    .await?;
                client.submit_burn(network.burn_contract, call).await
            })
            .await
            .inspect(|tx_hash| info!(tx_hash = %tx_hash, event = "burn_submitted"))
        }
        .instrument(spans::burn(
            network.network_id,
            sender,
            call.destination_domain,
            call.amount,
        ))
        .await
    }

    /// Waits for the burn to be mined and derives the transfer identifier.
    pub async fn confirm(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        destination_domain: DomainId,
        tx_hash: TxHash,
    ) -> Result<BurnOutcome> {
        let receipt = with_retry(&self.clock, &self.retry, "confirm_burn", || {
            wait_for_confirmation(
                client,
                &self.clock,
                network.network_id,
                tx_hash,
                &self.confirmation,
            )
        })
        .await?;

        let context = ExtractionContext {
            burn_tx_hash: tx_hash,
            message_transmitter: network.mint_contract,
            source_domain: network.domain_id,
            destination_domain,
        };
        let transfer_identifier = self.extractors.extract(&receipt.logs, &context);

        info!(
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            has_identifier = transfer_identifier.is_some(),
            event = "burn_confirmed"
        );

        Ok(BurnOutcome {
            tx_hash,
            block_number: receipt.block_number,
            transfer_identifier,
        })
    }

    /// [`BurnSubmitter::submit`] followed by [`BurnSubmitter::confirm`].
    pub async fn burn(
        &self,
        client: &dyn ChainClient,
        network: &NetworkConfig,
        call: &BurnCall,
        existing: Option<TxHash>,
    ) -> Result<BurnOutcome> {
        let tx_hash = self.submit(client, network, call, existing).await?;
        self.confirm(client, network, call.destination_domain, tx_hash)
            .await
    }
}
