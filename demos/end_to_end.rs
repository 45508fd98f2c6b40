//! End-to-end transfer against in-memory fakes
//!
//! Drives one Ethereum → Base transfer through every state without a node or
//! network access, printing the audit trail at the end. Virtual time means
//! the 30 second attestation grace period passes instantly.
//!
//! Run with: `RUST_LOG=cctp_orchestrator=debug cargo run --example end_to_end`

use alloy_chains::NamedChain;
use alloy_primitives::U256;
use cctp_orchestrator::store::InMemoryTransferStore;
use cctp_orchestrator::testing::{
    AttestationScript, FakeAttestationProvider, FakeChainClient, FakeClock,
};
use cctp_orchestrator::traits::ChainClient;
use cctp_orchestrator::{
    ChainRegistry, DomainId, OrchestratorConfig, Result, StepOutcome, TransferOrchestrator,
    TransferRequest,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("🌉 CCTP Transfer Orchestrator - Ethereum → Base (simulated)");
    println!("===========================================================\n");

    let registry = ChainRegistry::mainnet();
    let ethereum_config = *registry.get(NamedChain::Mainnet)?;

    let clock = FakeClock::new();
    let ethereum = FakeChainClient::new(DomainId::Ethereum);
    let base = FakeChainClient::new(DomainId::Base);
    let attestations = FakeAttestationProvider::new(clock.clone());
    attestations.set_default_script(AttestationScript::PendingFor(6));

    ethereum.set_balance(
        ethereum_config.token_contract,
        ethereum.sender(),
        U256::from(25_000_000u64),
    );

    let orchestrator = TransferOrchestrator::builder()
        .registry(registry)
        .store(InMemoryTransferStore::new())
        .attestation_provider(attestations.clone())
        .clock(clock.clone())
        .config(OrchestratorConfig::default())
        .build()
        .with_client(NamedChain::Mainnet, Arc::new(ethereum.clone()))
        .with_client(NamedChain::Base, Arc::new(base.clone()));

    let id = orchestrator
        .initiate_transfer(
            TransferRequest::builder()
                .source_network(NamedChain::Mainnet)
                .destination_network(NamedChain::Base)
                .amount(U256::from(10_000_000u64))
                .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
                .build(),
        )
        .await?;
    println!("📝 Transfer {id} created\n");

    loop {
        match orchestrator.advance(id).await? {
            StepOutcome::Advanced { from, to } => println!("   {from} → {to}"),
            StepOutcome::AwaitingOperator => {
                println!("   ⚠️  waiting for manual reconciliation");
                break;
            }
            StepOutcome::Terminal(state) => {
                println!("\n✅ Finished in {state}");
                break;
            }
        }
    }

    let record = orchestrator.get_status(id).await?;
    println!("\n📊 Summary");
    println!("   Approve tx: {:?}", record.approve_tx_hash());
    println!("   Burn tx:    {:?}", record.burn_tx_hash());
    println!("   Identifier: {:?}", record.transfer_identifier());
    println!("   Mint tx:    {:?}", record.mint_tx_hash());
    println!("   Elapsed:    {:?} (virtual)", clock.total_sleep_time());
    println!(
        "   Remaining:  {} on Ethereum",
        ethereum.balance(ethereum_config.token_contract, ethereum.sender())
    );
    println!("   Attestation polls: {}", attestations.total_calls());
    println!("   Mints on Base:     {}", base.mint_count());

    Ok(())
}
