//! Contract bindings
//!
//! Alloy `sol!` bindings and thin wrappers for the token, burn, and mint
//! contracts. Wrappers only build transactions and perform view calls;
//! sending goes through [`crate::providers::AlloyChainClient`].

pub mod erc20;
pub mod v2;
