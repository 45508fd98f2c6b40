//! CCTP domain identifiers
//!
//! A domain is the protocol-level numeric id Circle assigns to each network.
//! It is distinct from the EVM chain id and is what burn calls and the
//! attestation API are keyed on.
//!
//! Reference: <https://developers.circle.com/cctp/supported-domains>

use serde::{Deserialize, Serialize};
use std::fmt;

/// CCTP domain identifier for the EVM networks this crate can route between.
///
/// # Example
///
/// ```rust
/// use cctp_orchestrator::DomainId;
///
/// assert_eq!(DomainId::Base.as_u32(), 6);
/// assert_eq!(DomainId::try_from(3).unwrap(), DomainId::Arbitrum);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
#[non_exhaustive]
pub enum DomainId {
    /// Ethereum mainnet and Sepolia (0)
    Ethereum = 0,
    /// Avalanche C-Chain and Fuji (1)
    Avalanche = 1,
    /// OP Mainnet and OP Sepolia (2)
    Optimism = 2,
    /// Arbitrum One and Arbitrum Sepolia (3)
    Arbitrum = 3,
    /// Base and Base Sepolia (6)
    Base = 6,
    /// Polygon PoS and Amoy (7)
    Polygon = 7,
    /// Unichain (10)
    Unichain = 10,
    /// Linea (11)
    Linea = 11,
    /// Sonic (13)
    Sonic = 13,
    /// World Chain (14)
    WorldChain = 14,
}

impl DomainId {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ethereum),
            1 => Some(Self::Avalanche),
            2 => Some(Self::Optimism),
            3 => Some(Self::Arbitrum),
            6 => Some(Self::Base),
            7 => Some(Self::Polygon),
            10 => Some(Self::Unichain),
            11 => Some(Self::Linea),
            13 => Some(Self::Sonic),
            14 => Some(Self::WorldChain),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Avalanche => "Avalanche",
            Self::Optimism => "Optimism",
            Self::Arbitrum => "Arbitrum",
            Self::Base => "Base",
            Self::Polygon => "Polygon",
            Self::Unichain => "Unichain",
            Self::Linea => "Linea",
            Self::Sonic => "Sonic",
            Self::WorldChain => "World Chain",
        }
    }
}

impl From<DomainId> for u32 {
    #[inline]
    fn from(domain: DomainId) -> Self {
        domain.as_u32()
    }
}

impl TryFrom<u32> for DomainId {
    type Error = InvalidDomainId;

    #[inline]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_u32(value).ok_or(InvalidDomainId(value))
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}

/// Error returned when a u32 is not a known domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDomainId(pub u32);

impl fmt::Display for InvalidDomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CCTP domain ID: {}", self.0)
    }
}

impl std::error::Error for InvalidDomainId {}
