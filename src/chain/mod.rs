//! Chain registry and contract addresses
//!
//! Maps each supported network to its USDC, burn, and mint contracts and its
//! CCTP domain.

mod addresses;
mod registry;

pub use addresses::{
    CCTP_V2_MESSAGE_TRANSMITTER_MAINNET, CCTP_V2_MESSAGE_TRANSMITTER_TESTNET,
    CCTP_V2_TOKEN_MESSENGER_MAINNET, CCTP_V2_TOKEN_MESSENGER_TESTNET,
};
pub use registry::{ChainRegistry, NetworkConfig};
