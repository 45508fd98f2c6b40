//! Alloy-based chain client implementation.

use alloy_network::{Ethereum, ReceiptResponse};
use alloy_primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::burn::BurnCall;
use crate::contracts::erc20::Erc20Contract;
use crate::contracts::v2::{MessageTransmitterV2Contract, TokenMessengerV2Contract};
use crate::error::Result;
use crate::traits::{ChainClient, TxReceipt};

/// [`ChainClient`] over an Alloy [`Provider`].
///
/// The provider must carry a wallet filler for `sender`; transactions are
/// built with `from = sender` and handed to the provider for signing and
/// broadcast.
///
/// # Examples
///
/// ```rust,no_run
/// use alloy_provider::ProviderBuilder;
/// use cctp_orchestrator::providers::AlloyChainClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("https://eth.llamarpc.com").await?;
/// let sender = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse()?;
/// let client = AlloyChainClient::new(provider, sender);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlloyChainClient<P>
where
    P: Provider<Ethereum> + Clone,
{
    provider: P,
    sender: Address,
}

impl<P> AlloyChainClient<P>
where
    P: Provider<Ethereum> + Clone,
{
    pub fn new(provider: P, sender: Address) -> Self {
        Self { provider, sender }
    }

    /// Returns a reference to the underlying Alloy provider.
    pub fn inner(&self) -> &P {
        &self.provider
    }

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash> {
        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, event = "transaction_sent");
        Ok(tx_hash)
    }
}

#[async_trait]
impl<P> ChainClient for AlloyChainClient<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    fn sender(&self) -> Address {
        self.sender
    }

    #[instrument(skip(self), fields(token = %token, owner = %owner))]
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let balance = Erc20Contract::new(token, self.provider.clone())
            .balance_of(owner)
            .await?;
        Ok(balance)
    }

    #[instrument(skip(self), fields(token = %token, owner = %owner, spender = %spender))]
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let allowance = Erc20Contract::new(token, self.provider.clone())
            .allowance(owner, spender)
            .await?;
        Ok(allowance)
    }

    async fn submit_approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let tx = Erc20Contract::new(token, self.provider.clone()).approve_transaction(
            self.sender,
            spender,
            amount,
        );
        self.send(tx).await
    }

    async fn submit_burn(&self, burn_contract: Address, call: &BurnCall) -> Result<TxHash> {
        let tx = TokenMessengerV2Contract::new(burn_contract, self.provider.clone())
            .deposit_for_burn_transaction(
                self.sender,
                call.amount,
                call.destination_domain,
                call.mint_recipient,
                call.burn_token,
                call.destination_caller,
                call.max_fee,
                call.min_finality_threshold,
                call.hook_data.clone(),
            );
        self.send(tx).await
    }

    async fn submit_mint(
        &self,
        mint_contract: Address,
        message: Bytes,
        attestation: Bytes,
    ) -> Result<TxHash> {
        let tx = MessageTransmitterV2Contract::new(mint_contract, self.provider.clone())
            .receive_message_transaction(message, attestation, self.sender);
        self.send(tx).await
    }

    async fn is_message_received(
        &self,
        mint_contract: Address,
        nonce: FixedBytes<32>,
    ) -> Result<bool> {
        let received = MessageTransmitterV2Contract::new(mint_contract, self.provider.clone())
            .is_message_received(nonce)
            .await?;
        Ok(received)
    }

    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        trace!(event = "fetching_transaction_receipt");
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;

        Ok(receipt.map(|receipt| TxReceipt {
            tx_hash,
            block_number: ReceiptResponse::block_number(&receipt),
            success: ReceiptResponse::status(&receipt),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }))
    }
}
