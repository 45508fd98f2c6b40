//! MessageTransmitterV2 bindings
//!
//! Emits `MessageSent` on the source chain during a burn and accepts
//! `receiveMessage(message, attestation)` on the destination chain to mint.

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, FixedBytes};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::sol;
use tracing::{debug, info};

use MessageTransmitterV2::MessageTransmitterV2Instance;

pub struct MessageTransmitterV2Contract<P: Provider<Ethereum>> {
    instance: MessageTransmitterV2Instance<P>,
}

impl<P: Provider<Ethereum>> MessageTransmitterV2Contract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: MessageTransmitterV2Instance::new(address, provider),
        }
    }

    /// Builds the mint transaction for an attested message.
    pub fn receive_message_transaction(
        &self,
        message: Bytes,
        attestation: Bytes,
        from: Address,
    ) -> TransactionRequest {
        info!(
            message_len = message.len(),
            attestation_len = attestation.len(),
            from = %from,
            contract_address = %self.instance.address(),
            event = "receive_message_transaction_created"
        );

        self.instance
            .receiveMessage(message, attestation)
            .from(from)
            .into_transaction_request()
    }

    /// Whether a message with this nonce has already been received.
    ///
    /// The contract stores a non-zero marker in `usedNonces` once a message is
    /// processed; a second `receiveMessage` for it would revert.
    pub async fn is_message_received(
        &self,
        nonce: FixedBytes<32>,
    ) -> Result<bool, alloy_contract::Error> {
        let marker = self.instance.usedNonces(nonce).call().await?;

        debug!(
            nonce = %nonce,
            is_received = !marker.is_zero(),
            event = "is_message_received_checked"
        );

        Ok(!marker.is_zero())
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract MessageTransmitterV2 {
        event MessageSent(bytes message);

        function receiveMessage(bytes message, bytes attestation) external returns (bool success);

        function usedNonces(bytes32 nonce) external view returns (uint256);
    }
);
