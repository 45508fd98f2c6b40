//! # cctp-orchestrator
//!
//! A resumable orchestrator for USDC transfers over Circle's Cross-Chain
//! Transfer Protocol (CCTP) v2.
//!
//! A transfer burns USDC on the source network, waits for Circle's
//! attestation service to sign the burn message, and mints on the
//! destination network. Each step is persisted before the next one starts,
//! so a crashed or restarted process resumes exactly where it stopped
//! without burning or minting twice.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alloy_chains::NamedChain;
//! use alloy_primitives::{address, U256};
//! use alloy_provider::ProviderBuilder;
//! use cctp_orchestrator::providers::{AlloyChainClient, IrisAttestationProvider, TokioClock};
//! use cctp_orchestrator::store::SledTransferStore;
//! use cctp_orchestrator::{
//!     ChainRegistry, OrchestratorConfig, TransferOrchestrator, TransferRequest, TransferState,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = address!("742d35Cc6634C0532925a3b844Bc9e7595f8fA0d");
//! // Providers must carry a wallet for `sender`
//! let ethereum = ProviderBuilder::new().connect("http://localhost:8545").await?;
//! let base = ProviderBuilder::new().connect("http://localhost:8546").await?;
//!
//! let orchestrator = TransferOrchestrator::builder()
//!     .registry(ChainRegistry::mainnet())
//!     .store(SledTransferStore::open("transfers.db")?)
//!     .attestation_provider(IrisAttestationProvider::production())
//!     .clock(TokioClock::new())
//!     .config(OrchestratorConfig::from_env()?)
//!     .build()
//!     .with_client(NamedChain::Mainnet, Arc::new(AlloyChainClient::new(ethereum, sender)))
//!     .with_client(NamedChain::Base, Arc::new(AlloyChainClient::new(base, sender)));
//!
//! let id = orchestrator
//!     .initiate_transfer(
//!         TransferRequest::builder()
//!             .source_network(NamedChain::Mainnet)
//!             .destination_network(NamedChain::Base)
//!             .amount(U256::from(10_000_000u64)) // 10 USDC
//!             .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
//!             .build(),
//!     )
//!     .await?;
//!
//! let record = orchestrator.drive(id).await?;
//! if record.state() == TransferState::Completed {
//!     println!("minted in {:?}", record.mint_tx_hash());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Resuming After a Restart
//!
//! ```rust,no_run
//! # use cctp_orchestrator::TransferOrchestrator;
//! # use cctp_orchestrator::providers::{IrisAttestationProvider, TokioClock};
//! # use cctp_orchestrator::store::SledTransferStore;
//! # async fn example(
//! #     orchestrator: TransferOrchestrator<SledTransferStore, IrisAttestationProvider, TokioClock>,
//! # ) -> cctp_orchestrator::Result<()> {
//! for id in orchestrator.pending_transfers().await? {
//!     let record = orchestrator.drive(id).await?;
//!     println!("{id}: {}", record.state());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Persisted state machine** with write-once transaction hashes
//! - **Per-state deadlines** and exponential backoff for transient failures
//! - **Reconciliation state** for burns whose outcome cannot be established
//! - **Pluggable seams** for chains, attestation, time, and storage
//! - **Fakes** in [`testing`] for deterministic tests without a node
//!
//! ## Public API
//!
//! - [`TransferOrchestrator`] and [`StepOutcome`] - drive transfers
//! - [`TransferRequest`], [`TransferRecord`], and [`TransferState`] - transfer data
//! - [`ChainRegistry`] and [`NetworkConfig`] - per-network contracts and domains
//! - [`OrchestratorConfig`] - polling, retry, confirmation, and deadline settings
//! - [`TransferError`], [`ErrorKind`], and [`Result`] - error handling
//! - [`traits`] - the seams, with implementations in [`providers`] and [`store`]

mod attestation;
mod burn;
mod chain;
mod config;
mod contracts;
mod error;
mod mint;
mod protocol;
mod submission;
mod token_ops;
mod transfer;

pub mod providers;
pub mod store;
pub mod testing;
pub mod traits;

pub use attestation::AttestationPoller;
pub use burn::{
    BurnCall, BurnOutcome, BurnSubmitter, ExtractionContext, ExtractorChain,
    IdentifierExtractor, MessagePayloadScan, MessageSentExtractor,
};
pub use chain::{
    ChainRegistry, NetworkConfig, CCTP_V2_MESSAGE_TRANSMITTER_MAINNET,
    CCTP_V2_MESSAGE_TRANSMITTER_TESTNET, CCTP_V2_TOKEN_MESSENGER_MAINNET,
    CCTP_V2_TOKEN_MESSENGER_TESTNET,
};
pub use config::{
    ConfirmationConfig, OrchestratorConfig, PollingConfig, RetryPolicy, StateBudgets, IRIS_API,
    IRIS_API_SANDBOX,
};
pub use contracts::{
    erc20::Erc20Contract,
    v2::{MessageSent, MessageTransmitterV2Contract, TokenMessengerV2Contract},
};
pub use error::{ErrorKind, Result, TransferError};
pub use mint::{MintOutcome, MintSubmission, MintSubmitter};
pub use protocol::{
    AttestationResult, AttestationStatus, DomainId, FinalityThreshold, InvalidDomainId,
    IrisMessage, MessageHeader, MessagesResponse,
};
pub use submission::{wait_for_confirmation, with_retry, SubmissionQueue};
pub use token_ops::{BalanceCheck, TokenOps};
pub use transfer::{
    StepOutcome, Timestamp, TransferFailure, TransferId, TransferIdentifier, TransferOrchestrator,
    TransferRecord, TransferRequest, TransferState, Transition,
};

// Public module for advanced users who need custom instrumentation
pub mod spans;
