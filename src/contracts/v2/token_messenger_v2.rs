//! TokenMessengerV2 bindings
//!
//! The burn side of CCTP v2. `depositForBurn` burns USDC from the sender and
//! makes the MessageTransmitter on the same chain emit `MessageSent`.

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::sol;
use tracing::info;

use crate::protocol::{DomainId, FinalityThreshold};
use TokenMessengerV2::TokenMessengerV2Instance;

pub struct TokenMessengerV2Contract<P: Provider<Ethereum>> {
    instance: TokenMessengerV2Instance<P>,
}

impl<P: Provider<Ethereum>> TokenMessengerV2Contract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: TokenMessengerV2Instance::new(address, provider),
        }
    }

    /// Builds the burn transaction.
    ///
    /// Uses `depositForBurnWithHook` when `hook_data` is present and
    /// `depositForBurn` otherwise. `destination_caller` of zero lets anyone
    /// relay the mint.
    #[allow(clippy::too_many_arguments)]
    pub fn deposit_for_burn_transaction(
        &self,
        from: Address,
        amount: U256,
        destination_domain: DomainId,
        mint_recipient: FixedBytes<32>,
        burn_token: Address,
        destination_caller: FixedBytes<32>,
        max_fee: U256,
        min_finality_threshold: FinalityThreshold,
        hook_data: Option<Bytes>,
    ) -> TransactionRequest {
        info!(
            from = %from,
            amount = %amount,
            destination_domain = %destination_domain,
            mint_recipient = %mint_recipient,
            burn_token = %burn_token,
            max_fee = %max_fee,
            finality_threshold = %min_finality_threshold,
            has_hooks = hook_data.is_some(),
            contract_address = %self.instance.address(),
            event = "deposit_for_burn_transaction_created"
        );

        match hook_data {
            Some(hook_data) => self
                .instance
                .depositForBurnWithHook(
                    amount,
                    destination_domain.as_u32(),
                    mint_recipient,
                    burn_token,
                    destination_caller,
                    max_fee,
                    min_finality_threshold.as_u32(),
                    hook_data,
                )
                .from(from)
                .into_transaction_request(),
            None => self
                .instance
                .depositForBurn(
                    amount,
                    destination_domain.as_u32(),
                    mint_recipient,
                    burn_token,
                    destination_caller,
                    max_fee,
                    min_finality_threshold.as_u32(),
                )
                .from(from)
                .into_transaction_request(),
        }
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }
}

sol!(
    #[allow(clippy::too_many_arguments)]
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract TokenMessengerV2 {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold
        ) external;

        function depositForBurnWithHook(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold,
            bytes hookData
        ) external;
    }
);
