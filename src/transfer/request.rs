use alloy_chains::NamedChain;
use alloy_primitives::{Address, FixedBytes, U256};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::Timestamp;
use crate::error::{Result, TransferError};

/// Immutable description of a requested transfer.
///
/// # Example
///
/// ```rust
/// use alloy_chains::NamedChain;
/// use alloy_primitives::U256;
/// use cctp_orchestrator::TransferRequest;
///
/// let request = TransferRequest::builder()
///     .source_network(NamedChain::Mainnet)
///     .destination_network(NamedChain::Base)
///     .amount(U256::from(1_000_000u64))
///     .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
///     .build();
///
/// assert_eq!(request.amount(), U256::from(1_000_000u64));
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    source_network: NamedChain,
    destination_network: NamedChain,
    /// Base units of the token
    amount: U256,
    #[builder(into)]
    recipient: String,
    #[builder(default = Timestamp::now())]
    requested_at: Timestamp,
}

impl TransferRequest {
    pub fn source_network(&self) -> NamedChain {
        self.source_network
    }

    pub fn destination_network(&self) -> NamedChain {
        self.destination_network
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn requested_at(&self) -> Timestamp {
        self.requested_at
    }

    /// Parses the recipient as an EVM address. The zero address is rejected.
    pub fn recipient_address(&self) -> Result<Address> {
        let address = Address::from_str(self.recipient.trim()).map_err(|e| {
            TransferError::Validation(format!("malformed recipient {}: {e}", self.recipient))
        })?;

        if address.is_zero() {
            return Err(TransferError::Validation(
                "recipient is the zero address".to_string(),
            ));
        }

        Ok(address)
    }

    /// Recipient left-padded to 32 bytes, as the burn contract expects.
    pub fn mint_recipient(&self) -> Result<FixedBytes<32>> {
        Ok(self.recipient_address()?.into_word())
    }
}
