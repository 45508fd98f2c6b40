use alloy_chains::NamedChain;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::addresses::*;
use crate::error::{Result, TransferError};
use crate::protocol::DomainId;

/// Static per-network configuration: which contracts to talk to and which
/// CCTP domain the network is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_id: NamedChain,
    pub domain_id: DomainId,
    /// USDC token contract
    pub token_contract: Address,
    /// TokenMessengerV2, also the `spender` for approvals
    pub burn_contract: Address,
    /// MessageTransmitterV2
    pub mint_contract: Address,
}

impl NetworkConfig {
    fn v2_mainnet(network_id: NamedChain, domain_id: DomainId, token_contract: Address) -> Self {
        Self {
            network_id,
            domain_id,
            token_contract,
            burn_contract: CCTP_V2_TOKEN_MESSENGER_MAINNET,
            mint_contract: CCTP_V2_MESSAGE_TRANSMITTER_MAINNET,
        }
    }

    fn v2_testnet(network_id: NamedChain, domain_id: DomainId, token_contract: Address) -> Self {
        Self {
            network_id,
            domain_id,
            token_contract,
            burn_contract: CCTP_V2_TOKEN_MESSENGER_TESTNET,
            mint_contract: CCTP_V2_MESSAGE_TRANSMITTER_TESTNET,
        }
    }
}

/// Read-only map of network id to [`NetworkConfig`].
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it
/// afterwards.
///
/// # Example
///
/// ```rust
/// use cctp_orchestrator::{ChainRegistry, DomainId};
/// use alloy_chains::NamedChain;
///
/// let registry = ChainRegistry::mainnet();
/// let base = registry.get(NamedChain::Base).unwrap();
/// assert_eq!(base.domain_id, DomainId::Base);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    networks: HashMap<NamedChain, NetworkConfig>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a network.
    pub fn with_network(mut self, config: NetworkConfig) -> Self {
        self.networks.insert(config.network_id, config);
        self
    }

    /// Registry of the CCTP v2 mainnets with a known USDC deployment.
    pub fn mainnet() -> Self {
        use NamedChain::*;

        [
            (Mainnet, DomainId::Ethereum, ETHEREUM_USDC),
            (Avalanche, DomainId::Avalanche, AVALANCHE_USDC),
            (Optimism, DomainId::Optimism, OPTIMISM_USDC),
            (Arbitrum, DomainId::Arbitrum, ARBITRUM_USDC),
            (Base, DomainId::Base, BASE_USDC),
            (Polygon, DomainId::Polygon, POLYGON_USDC),
            (Unichain, DomainId::Unichain, UNICHAIN_USDC),
            (Linea, DomainId::Linea, LINEA_USDC),
        ]
        .into_iter()
        .fold(Self::new(), |registry, (chain, domain, usdc)| {
            registry.with_network(NetworkConfig::v2_mainnet(chain, domain, usdc))
        })
    }

    /// Registry of the CCTP v2 testnets with a known USDC deployment.
    pub fn testnet() -> Self {
        use NamedChain::*;

        [
            (Sepolia, DomainId::Ethereum, SEPOLIA_USDC),
            (AvalancheFuji, DomainId::Avalanche, AVALANCHE_FUJI_USDC),
            (OptimismSepolia, DomainId::Optimism, OPTIMISM_SEPOLIA_USDC),
            (ArbitrumSepolia, DomainId::Arbitrum, ARBITRUM_SEPOLIA_USDC),
            (BaseSepolia, DomainId::Base, BASE_SEPOLIA_USDC),
        ]
        .into_iter()
        .fold(Self::new(), |registry, (chain, domain, usdc)| {
            registry.with_network(NetworkConfig::v2_testnet(chain, domain, usdc))
        })
    }

    /// Looks up a network, failing with a validation error if unregistered.
    pub fn get(&self, network: NamedChain) -> Result<&NetworkConfig> {
        self.networks.get(&network).ok_or_else(|| {
            TransferError::Validation(format!("network {network} is not registered"))
        })
    }

    pub fn contains(&self, network: NamedChain) -> bool {
        self.networks.contains_key(&network)
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NamedChain::Mainnet, DomainId::Ethereum)]
    #[case(NamedChain::Arbitrum, DomainId::Arbitrum)]
    #[case(NamedChain::Base, DomainId::Base)]
    #[case(NamedChain::Linea, DomainId::Linea)]
    fn test_mainnet_domains(#[case] chain: NamedChain, #[case] domain: DomainId) {
        let registry = ChainRegistry::mainnet();
        let config = registry.get(chain).unwrap();

        assert_eq!(config.domain_id, domain);
        assert_eq!(config.burn_contract, CCTP_V2_TOKEN_MESSENGER_MAINNET);
        assert_eq!(config.mint_contract, CCTP_V2_MESSAGE_TRANSMITTER_MAINNET);
    }

    #[test]
    fn test_testnet_uses_testnet_contracts() {
        let registry = ChainRegistry::testnet();
        let sepolia = registry.get(NamedChain::Sepolia).unwrap();

        assert_eq!(sepolia.burn_contract, CCTP_V2_TOKEN_MESSENGER_TESTNET);
        assert_eq!(sepolia.token_contract, SEPOLIA_USDC);
        assert!(!registry.contains(NamedChain::Mainnet));
    }

    #[test]
    fn test_unregistered_network_is_validation_error() {
        let registry = ChainRegistry::mainnet();
        let err = registry.get(NamedChain::Moonbeam).unwrap_err();

        assert!(matches!(err, TransferError::Validation(_)));
    }

    #[test]
    fn test_custom_network_overrides() {
        let custom = NetworkConfig {
            network_id: NamedChain::Base,
            domain_id: DomainId::Base,
            token_contract: Address::repeat_byte(0x11),
            burn_contract: Address::repeat_byte(0x22),
            mint_contract: Address::repeat_byte(0x33),
        };
        let registry = ChainRegistry::mainnet().with_network(custom);

        assert_eq!(registry.get(NamedChain::Base).unwrap(), &custom);
        assert_eq!(registry.len(), 8);
    }
}
