//! Resuming transfers after a restart
//!
//! Starts a transfer with an attestation service that never answers, lets it
//! time out, "restarts" by building a fresh orchestrator over the same sled
//! database, and then resumes the failed transfer once attestations flow.
//! The burn is sent exactly once across both runs.
//!
//! Run with: `cargo run --example resume_from_store`

use alloy_chains::NamedChain;
use alloy_primitives::U256;
use cctp_orchestrator::store::SledTransferStore;
use cctp_orchestrator::testing::{
    AttestationScript, FakeAttestationProvider, FakeChainClient, FakeClock,
};
use cctp_orchestrator::traits::ChainClient;
use cctp_orchestrator::{
    ChainRegistry, DomainId, OrchestratorConfig, Result, TransferOrchestrator, TransferRequest,
    TransferState,
};
use std::sync::Arc;

type Orchestrator = TransferOrchestrator<SledTransferStore, FakeAttestationProvider, FakeClock>;

fn orchestrator(
    store: SledTransferStore,
    ethereum: &FakeChainClient,
    base: &FakeChainClient,
    attestations: &FakeAttestationProvider,
    clock: &FakeClock,
) -> Orchestrator {
    TransferOrchestrator::builder()
        .registry(ChainRegistry::mainnet())
        .store(store)
        .attestation_provider(attestations.clone())
        .clock(clock.clone())
        .config(OrchestratorConfig::default())
        .build()
        .with_client(NamedChain::Mainnet, Arc::new(ethereum.clone()))
        .with_client(NamedChain::Base, Arc::new(base.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("🔄 Resume from store");
    println!("====================\n");

    let db = sled::Config::new().temporary(true).open()?;

    let clock = FakeClock::new();
    let ethereum = FakeChainClient::new(DomainId::Ethereum);
    let base = FakeChainClient::new(DomainId::Base);
    let attestations = FakeAttestationProvider::new(clock.clone());
    attestations.set_default_script(AttestationScript::NeverComplete);

    let usdc = ChainRegistry::mainnet().get(NamedChain::Mainnet)?.token_contract;
    ethereum.set_balance(usdc, ethereum.sender(), U256::from(1_000_000u64));

    // First run: attestation never arrives
    let id = {
        let first = orchestrator(
            SledTransferStore::from_db(db.clone())?,
            &ethereum,
            &base,
            &attestations,
            &clock,
        );
        let id = first
            .initiate_transfer(
                TransferRequest::builder()
                    .source_network(NamedChain::Mainnet)
                    .destination_network(NamedChain::Base)
                    .amount(U256::from(1_000_000u64))
                    .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
                    .build(),
            )
            .await?;

        let record = first.drive(id).await?;
        println!("1️⃣  First run ended in {}", record.state());
        if let Some(failure) = record.error() {
            println!(
                "   {:?} in {} (retryable: {})",
                failure.kind, failure.failed_in, failure.retryable
            );
        }
        println!("   Burn tx persisted: {:?}\n", record.burn_tx_hash());
        id
    };

    // Second run: same database, attestation service healthy again
    attestations.set_default_script(AttestationScript::CompleteImmediately);
    let second = orchestrator(
        SledTransferStore::from_db(db)?,
        &ethereum,
        &base,
        &attestations,
        &clock,
    );

    let stored = second.get_status(id).await?;
    println!("2️⃣  After restart the store reports {}", stored.state());

    if stored.state() == TransferState::Failed {
        let state = second.resume_transfer(id).await?;
        println!("   Resumed in {state}");
    }
    for pending in second.pending_transfers().await? {
        let record = second.drive(pending).await?;
        println!("   {pending} → {}", record.state());
    }

    println!("\n📊 Burns sent: {}", ethereum.burn_count());
    println!("   Mints sent: {}", base.mint_count());

    Ok(())
}
