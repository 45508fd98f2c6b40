//! Integration tests for the transfer lifecycle using fake implementations

use alloy_chains::NamedChain;
use alloy_primitives::{keccak256, Address, Log, TxHash, U256};
use async_trait::async_trait;
use cctp_orchestrator::store::{InMemoryTransferStore, SledTransferStore};
use cctp_orchestrator::testing::{
    AttestationScript, BurnLogMode, FakeAttestationProvider, FakeChainClient, FakeClock,
    SubmissionKind,
};
use cctp_orchestrator::traits::{ChainClient, Clock, TransferStore};
use cctp_orchestrator::{
    ChainRegistry, DomainId, ErrorKind, ExtractionContext, ExtractorChain, IdentifierExtractor,
    NetworkConfig, OrchestratorConfig, Result, StateBudgets, StepOutcome, TransferError,
    TransferId, TransferIdentifier, TransferOrchestrator, TransferRecord, TransferRequest,
    TransferState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RECIPIENT: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d";
const ONE_USDC: u64 = 1_000_000;

type Orchestrator<S> = TransferOrchestrator<S, FakeAttestationProvider, FakeClock>;

/// Fakes for an Ethereum -> Base route plus the orchestrator wired to them.
struct Harness<S> {
    orchestrator: Orchestrator<S>,
    store: S,
    ethereum: FakeChainClient,
    base: FakeChainClient,
    attestations: FakeAttestationProvider,
    clock: FakeClock,
    config: OrchestratorConfig,
}

impl Harness<InMemoryTransferStore> {
    fn new() -> Self {
        Self::with_store(InMemoryTransferStore::new(), OrchestratorConfig::default())
    }

    fn with_config(config: OrchestratorConfig) -> Self {
        Self::with_store(InMemoryTransferStore::new(), config)
    }
}

impl<S: TransferStore + Clone> Harness<S> {
    fn with_store(store: S, config: OrchestratorConfig) -> Self {
        let clock = FakeClock::new();
        let ethereum = FakeChainClient::new(DomainId::Ethereum);
        let base = FakeChainClient::new(DomainId::Base);
        let attestations = FakeAttestationProvider::new(clock.clone());

        let orchestrator = build(&store, &ethereum, &base, &attestations, &clock, config);
        Self {
            orchestrator,
            store,
            ethereum,
            base,
            attestations,
            clock,
            config,
        }
    }

    /// A second orchestrator over the same store and fakes, as after a
    /// process restart.
    fn restart(&self) -> Orchestrator<S> {
        build(
            &self.store,
            &self.ethereum,
            &self.base,
            &self.attestations,
            &self.clock,
            self.config,
        )
    }

    fn source(&self) -> NetworkConfig {
        *self
            .orchestrator
            .registry()
            .get(NamedChain::Mainnet)
            .unwrap()
    }

    fn fund(&self, amount: u64) {
        self.ethereum.set_balance(
            self.source().token_contract,
            self.ethereum.sender(),
            U256::from(amount),
        );
    }

    fn pre_approve(&self, amount: u64) {
        let source = self.source();
        self.ethereum.set_allowance(
            source.token_contract,
            self.ethereum.sender(),
            source.burn_contract,
            U256::from(amount),
        );
    }

    fn sender_balance(&self) -> U256 {
        self.ethereum
            .balance(self.source().token_contract, self.ethereum.sender())
    }

    async fn initiate(&self, amount: u64) -> TransferId {
        self.orchestrator
            .initiate_transfer(request(amount))
            .await
            .unwrap()
    }

    async fn advance_until(&self, id: TransferId, state: TransferState) -> TransferRecord {
        for _ in 0..20 {
            let record = self.orchestrator.get_status(id).await.unwrap();
            if record.state() == state {
                return record;
            }
            self.orchestrator.advance(id).await.unwrap();
        }
        panic!("transfer never reached {state}");
    }
}

fn build<S: TransferStore + Clone>(
    store: &S,
    ethereum: &FakeChainClient,
    base: &FakeChainClient,
    attestations: &FakeAttestationProvider,
    clock: &FakeClock,
    config: OrchestratorConfig,
) -> Orchestrator<S> {
    TransferOrchestrator::builder()
        .registry(ChainRegistry::mainnet())
        .store(store.clone())
        .attestation_provider(attestations.clone())
        .clock(clock.clone())
        .config(config)
        .build()
        .with_client(NamedChain::Mainnet, Arc::new(ethereum.clone()))
        .with_client(NamedChain::Base, Arc::new(base.clone()))
}

fn request(amount: u64) -> TransferRequest {
    TransferRequest::builder()
        .source_network(NamedChain::Mainnet)
        .destination_network(NamedChain::Base)
        .amount(U256::from(amount))
        .recipient(RECIPIENT)
        .build()
}

fn visited(record: &TransferRecord) -> Vec<TransferState> {
    std::iter::once(TransferState::Idle)
        .chain(record.transitions().iter().map(|t| t.to))
        .collect()
}

fn failure_kind(record: &TransferRecord) -> Option<ErrorKind> {
    record.error().map(|failure| failure.kind)
}

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn test_standard_transfer_with_approval() {
    let harness = Harness::new();
    harness.fund(5 * ONE_USDC);

    let id = harness.initiate(ONE_USDC).await;
    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(
        visited(&record),
        vec![
            TransferState::Idle,
            TransferState::CheckingBalance,
            TransferState::Approving,
            TransferState::Approved,
            TransferState::Burning,
            TransferState::Burned,
            TransferState::AwaitingAttestation,
            TransferState::Attested,
            TransferState::Minting,
            TransferState::Completed,
        ]
    );

    let burn_tx_hash = record.burn_tx_hash().expect("burn hash");
    let mint_tx_hash = record.mint_tx_hash().expect("mint hash");
    assert_ne!(burn_tx_hash, mint_tx_hash);
    assert!(record.approve_tx_hash().is_some());
    assert!(record.transfer_identifier().is_some());
    assert!(record.attestation().is_some());
    assert!(record.error().is_none());

    assert_eq!(harness.ethereum.approve_count(), 1);
    assert_eq!(harness.ethereum.burn_count(), 1);
    assert_eq!(harness.base.mint_count(), 1);
    assert_eq!(harness.sender_balance(), U256::from(4 * ONE_USDC));
}

#[tokio::test]
async fn test_state_sequence_is_monotonic() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;

    let mut observed = vec![harness.orchestrator.get_status(id).await.unwrap().state()];
    for _ in 0..20 {
        match harness.orchestrator.advance(id).await.unwrap() {
            StepOutcome::Advanced { from, to } => {
                assert_eq!(from, *observed.last().unwrap());
                observed.push(to);
            }
            StepOutcome::Terminal(state) => {
                assert_eq!(state, TransferState::Completed);
                break;
            }
            StepOutcome::AwaitingOperator => panic!("unexpected reconciliation"),
        }
    }

    assert!(observed.windows(2).all(|pair| pair[0] < pair[1]), "{observed:?}");
    assert_eq!(observed.last(), Some(&TransferState::Completed));
}

#[tokio::test]
async fn test_existing_allowance_skips_approval() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.pre_approve(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;

    harness.orchestrator.advance(id).await.unwrap();
    let outcome = harness.orchestrator.advance(id).await.unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Advanced {
            from: TransferState::CheckingBalance,
            to: TransferState::Burning,
        }
    );

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert!(!visited(&record).contains(&TransferState::Approving));
    assert!(record.approve_tx_hash().is_none());
    assert_eq!(harness.ethereum.approve_count(), 0);
}

#[tokio::test]
async fn test_insufficient_funds_fails_without_transactions() {
    let harness = Harness::new();
    harness.fund(ONE_USDC - 1);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::InsufficientFunds));
    assert!(!record.error().unwrap().retryable);
    assert_eq!(record.error().unwrap().failed_in, TransferState::CheckingBalance);
    assert!(harness.ethereum.submissions().is_empty());
    assert!(harness.base.submissions().is_empty());

    assert!(harness.orchestrator.resume_transfer(id).await.is_err());
}

#[tokio::test]
async fn test_repeated_advance_always_terminates() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;

    let mut terminal = None;
    for _ in 0..50 {
        if let StepOutcome::Terminal(state) = harness.orchestrator.advance(id).await.unwrap() {
            terminal = Some(state);
            break;
        }
    }

    assert_eq!(terminal, Some(TransferState::Completed));
    assert_eq!(
        harness.orchestrator.advance(id).await.unwrap(),
        StepOutcome::Terminal(TransferState::Completed)
    );
    assert_eq!(harness.ethereum.burn_count(), 1);
    assert_eq!(harness.base.mint_count(), 1);
}

// ============================================================================
// Attestation
// ============================================================================

#[tokio::test]
async fn test_attestation_completing_just_before_deadline_proceeds_to_mint() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness
        .advance_until(id, TransferState::AwaitingAttestation)
        .await;
    let entered = record.state_entered_at();
    assert_eq!(
        record.deadline(),
        entered.saturating_add(Duration::from_secs(30 * 60))
    );
    harness.attestations.script(
        record.burn_tx_hash().unwrap(),
        AttestationScript::CompleteAt(entered.saturating_add(Duration::from_secs(29 * 60))),
    );

    harness.orchestrator.advance(id).await.unwrap();
    let record = harness.orchestrator.get_status(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Attested);
    assert_eq!(
        harness.clock.now().saturating_duration_since(entered),
        Duration::from_secs(29 * 60)
    );

    harness.orchestrator.advance(id).await.unwrap();
    let record = harness.orchestrator.get_status(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Minting);
}

#[tokio::test]
async fn test_attestation_timeout_is_bounded_and_resumable() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness
        .attestations
        .set_default_script(AttestationScript::NeverComplete);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness
        .advance_until(id, TransferState::AwaitingAttestation)
        .await;
    let deadline = record.deadline();
    let burn_tx_hash = record.burn_tx_hash().unwrap();

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::AttestationTimeout));
    assert!(record.error().unwrap().retryable);
    assert!(harness.clock.now() <= deadline.saturating_add(harness.config.polling.poll_interval));
    assert_eq!(record.burn_tx_hash(), Some(burn_tx_hash));

    harness
        .attestations
        .script(burn_tx_hash, AttestationScript::CompleteImmediately);
    let resumed = harness.orchestrator.resume_transfer(id).await.unwrap();
    assert_eq!(resumed, TransferState::AwaitingAttestation);

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(record.resumptions(), 1);
    assert_eq!(harness.ethereum.burn_count(), 1);
    assert_eq!(harness.base.mint_count(), 1);
}

#[tokio::test]
async fn test_rejected_attestation_fails_without_retry() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness
        .attestations
        .set_default_script(AttestationScript::Reject("invalid domain".to_string()));
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::AttestationRejected));
    assert!(!record.error().unwrap().retryable);
    assert_eq!(
        harness
            .attestations
            .call_count(record.burn_tx_hash().unwrap()),
        1
    );
}

// ============================================================================
// Idempotency
// ============================================================================

#[tokio::test]
async fn test_confirmation_timeout_keeps_burn_hash_and_never_reburns() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.pre_approve(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;
    harness.advance_until(id, TransferState::Burning).await;

    harness.ethereum.withhold_receipts(true);
    harness.orchestrator.advance(id).await.unwrap();

    let record = harness.orchestrator.get_status(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::ConfirmationTimeout));
    assert!(record.burn_tx_hash().is_some());
    assert_eq!(harness.ethereum.burn_count(), 1);

    harness.ethereum.withhold_receipts(false);
    assert_eq!(
        harness.orchestrator.resume_transfer(id).await.unwrap(),
        TransferState::Burning
    );
    let resumed = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(resumed.state(), TransferState::Completed);
    assert_eq!(resumed.burn_tx_hash(), record.burn_tx_hash());
    assert_eq!(harness.ethereum.burn_count(), 1);
}

#[tokio::test]
async fn test_restart_mid_transfer_resumes_from_store() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;
    harness
        .advance_until(id, TransferState::AwaitingAttestation)
        .await;

    let restarted = harness.restart();
    assert_eq!(restarted.pending_transfers().await.unwrap(), vec![id]);

    let record = restarted.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert!(restarted.pending_transfers().await.unwrap().is_empty());
    assert_eq!(harness.ethereum.approve_count(), 1);
    assert_eq!(harness.ethereum.burn_count(), 1);
    assert_eq!(harness.base.mint_count(), 1);
}

#[tokio::test]
async fn test_concurrent_drivers_submit_once() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;

    let (first, second) = tokio::join!(
        harness.orchestrator.drive(id),
        harness.orchestrator.drive(id),
    );

    assert_eq!(first.unwrap().state(), TransferState::Completed);
    assert_eq!(second.unwrap().state(), TransferState::Completed);
    assert_eq!(harness.ethereum.burn_count(), 1);
    assert_eq!(harness.base.mint_count(), 1);
}

#[tokio::test]
async fn test_same_account_transfers_do_not_spend_each_others_allowance() {
    let harness = Harness::new();
    harness.fund(2 * ONE_USDC);
    harness.pre_approve(ONE_USDC);
    let first = harness.initiate(ONE_USDC).await;
    let second = harness.initiate(ONE_USDC).await;

    // Both see the single approval and skip APPROVING
    harness.advance_until(first, TransferState::Burning).await;
    harness.advance_until(second, TransferState::Burning).await;
    assert_eq!(harness.ethereum.approve_count(), 0);

    let (first, second) = tokio::join!(
        harness.orchestrator.drive(first),
        harness.orchestrator.drive(second),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.state(), TransferState::Completed);
    assert_eq!(second.state(), TransferState::Completed);
    assert_eq!(harness.ethereum.burn_count(), 2);
    assert_eq!(harness.ethereum.approve_count(), 1);
    assert_eq!(harness.base.mint_count(), 2);
    assert_eq!(harness.sender_balance(), U256::ZERO);

    // Identical burns still get distinct identifiers
    assert!(first.transfer_identifier().is_some());
    assert_ne!(first.transfer_identifier(), second.transfer_identifier());
}

#[tokio::test]
async fn test_balance_spent_by_another_transfer_fails_before_burning() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.pre_approve(2 * ONE_USDC);
    let first = harness.initiate(ONE_USDC).await;
    let second = harness.initiate(ONE_USDC).await;
    harness.advance_until(first, TransferState::Burning).await;
    harness.advance_until(second, TransferState::Burning).await;

    let first = harness.orchestrator.drive(first).await.unwrap();
    let second = harness.orchestrator.drive(second).await.unwrap();

    assert_eq!(first.state(), TransferState::Completed);
    assert_eq!(second.state(), TransferState::Failed);
    assert_eq!(failure_kind(&second), Some(ErrorKind::InsufficientFunds));
    assert_eq!(second.error().unwrap().failed_in, TransferState::Burning);
    assert!(second.burn_tx_hash().is_none());
    assert!(!second.burn_submission_started());
    assert_eq!(harness.ethereum.burn_count(), 1);
}

#[tokio::test]
async fn test_mint_skipped_when_message_already_received() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;
    let record = harness.advance_until(id, TransferState::Minting).await;

    // Nonce the fake attestation service assigns to this burn
    harness
        .base
        .mark_message_received(keccak256(record.burn_tx_hash().unwrap()));

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(record.mint_tx_hash(), None);
    assert_eq!(harness.base.mint_count(), 0);
}

#[tokio::test]
async fn test_reverted_mint_fails_with_unrecoverable_submission() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.base.revert_next(SubmissionKind::Mint);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::UnrecoverableSubmission));
    assert_eq!(record.error().unwrap().failed_in, TransferState::Minting);
    assert!(record.mint_tx_hash().is_some());
    assert!(record.attestation().is_some());
    assert_eq!(harness.base.mint_count(), 1);
}

// ============================================================================
// Failures and recovery
// ============================================================================

#[tokio::test]
async fn test_transient_send_failures_are_retried() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.pre_approve(ONE_USDC);
    harness.ethereum.fail_next_sends(2);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(harness.ethereum.burn_count(), 1);
    let sleeps = harness.clock.sleeps();
    assert!(sleeps.contains(&Duration::from_secs(1)));
    assert!(sleeps.contains(&Duration::from_secs(2)));
}

#[tokio::test]
async fn test_ineffective_approval_fails_before_burn() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.ethereum.make_approvals_ineffective();
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::ApprovalNotEffective));
    assert!(record.error().unwrap().retryable);
    assert!(harness.ethereum.approve_count() >= 1);
    assert_eq!(harness.ethereum.burn_count(), 0);
}

#[tokio::test]
async fn test_expired_deadline_fails_and_resumes() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;

    harness.clock.advance(Duration::from_secs(3600));
    harness.orchestrator.advance(id).await.unwrap();

    let record = harness.orchestrator.get_status(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Failed);
    assert_eq!(failure_kind(&record), Some(ErrorKind::DeadlineExceeded));
    assert_eq!(record.error().unwrap().failed_in, TransferState::Idle);

    harness.orchestrator.resume_transfer(id).await.unwrap();
    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
}

#[tokio::test]
async fn test_cancel_only_before_burning() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);

    let early = harness.initiate(ONE_USDC).await;
    harness.advance_until(early, TransferState::Approved).await;
    assert!(harness.orchestrator.cancel_transfer(early).await.unwrap());
    assert_eq!(harness.ethereum.burn_count(), 0);

    let late = harness.initiate(ONE_USDC).await;
    harness.advance_until(late, TransferState::Burned).await;
    assert!(!harness.orchestrator.cancel_transfer(late).await.unwrap());
    assert_eq!(
        harness.orchestrator.get_status(late).await.unwrap().state(),
        TransferState::Burned
    );
}

#[tokio::test]
async fn test_custom_attestation_budget() {
    let config = OrchestratorConfig::default()
        .with_budgets(StateBudgets::default().with_attestation(Duration::from_secs(120)));
    let harness = Harness::with_config(config);
    harness.fund(ONE_USDC);
    harness
        .attestations
        .set_default_script(AttestationScript::NeverComplete);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness
        .advance_until(id, TransferState::AwaitingAttestation)
        .await;
    let entered = record.state_entered_at();
    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(failure_kind(&record), Some(ErrorKind::AttestationTimeout));
    assert!(harness.clock.now().saturating_duration_since(entered) <= Duration::from_secs(130));
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_renamed_event_falls_back_to_payload_scan() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.ethereum.set_burn_log_mode(BurnLogMode::RenamedEvent);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Completed);
    assert!(record.transfer_identifier().is_some());
}

#[tokio::test]
async fn test_missing_burn_logs_require_reconciliation() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.ethereum.set_burn_log_mode(BurnLogMode::NoLogs);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::ReconciliationRequired);
    assert_eq!(failure_kind(&record), Some(ErrorKind::ProtocolMismatch));
    assert!(record.transfer_identifier().is_none());
    assert_eq!(
        harness.orchestrator.advance(id).await.unwrap(),
        StepOutcome::AwaitingOperator
    );
    assert!(!harness.orchestrator.cancel_transfer(id).await.unwrap());

    let identifier = TransferIdentifier::new(keccak256(b"identifier from explorer"));
    let resolved = harness
        .orchestrator
        .resolve_reconciliation(id, None, identifier)
        .await
        .unwrap();
    assert_eq!(resolved.state(), TransferState::Burned);
    assert_eq!(resolved.transfer_identifier(), Some(identifier));

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(harness.ethereum.burn_count(), 1);
}

#[tokio::test]
async fn test_message_sent_from_another_contract_is_not_trusted() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.ethereum.set_burn_log_mode(BurnLogMode::ForeignEmitter);
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::ReconciliationRequired);
    assert!(record.transfer_identifier().is_none());
    assert_eq!(harness.ethereum.burn_count(), 1);
}

/// Looks the identifier up out of band instead of reading receipt logs.
#[derive(Debug)]
struct ReceiptHashLookup;

impl IdentifierExtractor for ReceiptHashLookup {
    fn name(&self) -> &'static str {
        "receipt_hash_lookup"
    }

    fn extract(&self, _logs: &[Log], context: &ExtractionContext) -> Option<TransferIdentifier> {
        Some(TransferIdentifier::new(keccak256(context.burn_tx_hash)))
    }
}

#[tokio::test]
async fn test_custom_extraction_strategy() {
    let harness = Harness::new();
    harness.fund(ONE_USDC);
    harness.ethereum.set_burn_log_mode(BurnLogMode::NoLogs);
    let orchestrator = TransferOrchestrator::builder()
        .registry(ChainRegistry::mainnet())
        .store(harness.store.clone())
        .attestation_provider(harness.attestations.clone())
        .clock(harness.clock.clone())
        .extractors(ExtractorChain::new(vec![Box::new(ReceiptHashLookup)]))
        .build()
        .with_client(NamedChain::Mainnet, Arc::new(harness.ethereum.clone()))
        .with_client(NamedChain::Base, Arc::new(harness.base.clone()));

    let id = orchestrator.initiate_transfer(request(ONE_USDC)).await.unwrap();
    let record = orchestrator.drive(id).await.unwrap();

    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(
        record.transfer_identifier(),
        Some(TransferIdentifier::new(keccak256(record.burn_tx_hash().unwrap())))
    );
}

/// Store that refuses to persist burn hashes while armed, standing in for a
/// crash between sending the burn and recording it.
#[derive(Debug, Clone, Default)]
struct CrashingStore {
    inner: InMemoryTransferStore,
    crash_on_burn_hash: Arc<AtomicBool>,
}

#[async_trait]
impl TransferStore for CrashingStore {
    async fn load(&self, id: TransferId) -> Result<Option<TransferRecord>> {
        self.inner.load(id).await
    }

    async fn save(&self, record: &TransferRecord) -> Result<()> {
        if self.crash_on_burn_hash.load(Ordering::SeqCst) && record.burn_tx_hash().is_some() {
            return Err(TransferError::Storage("process killed".to_string()));
        }
        self.inner.save(record).await
    }

    async fn list(&self) -> Result<Vec<TransferRecord>> {
        self.inner.list().await
    }
}

#[tokio::test]
async fn test_interrupted_burn_requires_reconciliation_not_resubmission() {
    let store = CrashingStore::default();
    let harness = Harness::with_store(store.clone(), OrchestratorConfig::default());
    harness.fund(ONE_USDC);
    harness.pre_approve(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;
    harness.advance_until(id, TransferState::Burning).await;

    store.crash_on_burn_hash.store(true, Ordering::SeqCst);
    let err = harness.orchestrator.advance(id).await.unwrap_err();
    assert!(matches!(err, TransferError::Storage(_)));
    assert_eq!(harness.ethereum.burn_count(), 1);
    store.crash_on_burn_hash.store(false, Ordering::SeqCst);

    let restarted = harness.restart();
    let stored = restarted.get_status(id).await.unwrap();
    assert_eq!(stored.state(), TransferState::Burning);
    assert!(stored.burn_submission_started());
    assert!(stored.burn_tx_hash().is_none());

    assert_eq!(
        restarted.advance(id).await.unwrap(),
        StepOutcome::Advanced {
            from: TransferState::Burning,
            to: TransferState::ReconciliationRequired,
        }
    );
    assert_eq!(harness.ethereum.burn_count(), 1);

    let missing_hash = restarted
        .resolve_reconciliation(id, None, TransferIdentifier::new(keccak256(b"id")))
        .await
        .unwrap_err();
    assert!(matches!(missing_hash, TransferError::Validation(_)));

    let burn_tx_hash: TxHash = harness.ethereum.submissions()[0].tx_hash;
    restarted
        .resolve_reconciliation(
            id,
            Some(burn_tx_hash),
            TransferIdentifier::new(keccak256(b"id")),
        )
        .await
        .unwrap();

    let record = restarted.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(record.burn_tx_hash(), Some(burn_tx_hash));
    assert!(!record.burn_submission_started());
    assert_eq!(harness.ethereum.burn_count(), 1);
}

// ============================================================================
// Durable store
// ============================================================================

#[tokio::test]
async fn test_sled_store_survives_restart() {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let store = SledTransferStore::from_db(db.clone()).unwrap();
    let harness = Harness::with_store(store, OrchestratorConfig::default());
    harness.fund(ONE_USDC);
    let id = harness.initiate(ONE_USDC).await;
    let before = harness.advance_until(id, TransferState::Burned).await;

    let reopened = SledTransferStore::from_db(db).unwrap();
    let restarted = build(
        &reopened,
        &harness.ethereum,
        &harness.base,
        &harness.attestations,
        &harness.clock,
        OrchestratorConfig::default(),
    );

    assert_eq!(restarted.get_status(id).await.unwrap(), before);
    let record = restarted.drive(id).await.unwrap();
    assert_eq!(record.state(), TransferState::Completed);
    assert_eq!(harness.ethereum.burn_count(), 1);
    assert_eq!(harness.base.mint_count(), 1);
}

#[tokio::test]
async fn test_unknown_sender_has_no_balance() {
    let harness = Harness::new();
    harness.ethereum.set_balance(
        harness.source().token_contract,
        Address::repeat_byte(0x01),
        U256::from(ONE_USDC),
    );
    let id = harness.initiate(ONE_USDC).await;

    let record = harness.orchestrator.drive(id).await.unwrap();
    assert_eq!(failure_kind(&record), Some(ErrorKind::InsufficientFunds));
}
