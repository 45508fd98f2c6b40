// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use alloy_chains::NamedChain;
use alloy_primitives::TxHash;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{error, info, warn, Instrument};

use super::{
    Timestamp, TransferId, TransferIdentifier, TransferRecord, TransferRequest, TransferState,
};
use crate::attestation::AttestationPoller;
use crate::burn::{BurnCall, BurnSubmitter, ExtractorChain};
use crate::chain::{ChainRegistry, NetworkConfig};
use crate::config::OrchestratorConfig;
use crate::error::{Result, TransferError};
use crate::mint::{MintSubmission, MintSubmitter};
use crate::protocol::AttestationResult;
use crate::spans;
use crate::submission::{with_retry, SubmissionQueue};
use crate::token_ops::TokenOps;
use crate::traits::{AttestationProvider, ChainClient, Clock, TransferStore};

/// What one call to [`TransferOrchestrator::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced {
        from: TransferState,
        to: TransferState,
    },
    /// The record is in `RECONCILIATION_REQUIRED`; only
    /// [`TransferOrchestrator::resolve_reconciliation`] moves it on.
    AwaitingOperator,
    Terminal(TransferState),
}

/// Drives transfers through their lifecycle.
///
/// Every step runs under a per-transfer lock, starts from the stored record
/// and persists the result before returning, so any number of callers may
/// advance the same transfer and a restarted process can pick up where the
/// last one stopped. Transaction hashes are persisted as soon as a
/// submission returns and are never replaced: a burn or mint with a known
/// hash is only ever re-checked, not resent.
///
/// # Example
///
/// ```rust,no_run
/// use alloy_chains::NamedChain;
/// use alloy_primitives::U256;
/// use cctp_orchestrator::providers::{IrisAttestationProvider, TokioClock};
/// use cctp_orchestrator::store::SledTransferStore;
/// use cctp_orchestrator::{ChainRegistry, OrchestratorConfig, TransferOrchestrator, TransferRequest};
/// # use std::sync::Arc;
/// # use cctp_orchestrator::traits::ChainClient;
///
/// # async fn example(
/// #     ethereum: Arc<dyn ChainClient>,
/// #     base: Arc<dyn ChainClient>,
/// # ) -> cctp_orchestrator::Result<()> {
/// let orchestrator = TransferOrchestrator::builder()
///     .registry(ChainRegistry::mainnet())
///     .store(SledTransferStore::open("transfers.db")?)
///     .attestation_provider(IrisAttestationProvider::production())
///     .clock(TokioClock::new())
///     .config(OrchestratorConfig::from_env()?)
///     .build()
///     .with_client(NamedChain::Mainnet, ethereum)
///     .with_client(NamedChain::Base, base);
///
/// let id = orchestrator
///     .initiate_transfer(
///         TransferRequest::builder()
///             .source_network(NamedChain::Mainnet)
///             .destination_network(NamedChain::Base)
///             .amount(U256::from(10_000_000u64))
///             .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
///             .build(),
///     )
///     .await?;
///
/// let record = orchestrator.drive(id).await?;
/// println!("{id}: {}", record.state());
/// # Ok(())
/// # }
/// ```
pub struct TransferOrchestrator<S, A, C> {
    registry: Arc<ChainRegistry>,
    clients: HashMap<NamedChain, Arc<dyn ChainClient>>,
    store: S,
    clock: C,
    token_ops: TokenOps<C>,
    burns: BurnSubmitter<C>,
    mints: MintSubmitter<C>,
    poller: AttestationPoller<A, C>,
    config: OrchestratorConfig,
    /// Live per-transfer locks; entries die with their last holder
    locks: Mutex<HashMap<TransferId, Weak<Mutex<()>>>>,
}

#[bon::bon]
impl<S, A, C> TransferOrchestrator<S, A, C>
where
    S: TransferStore,
    A: AttestationProvider,
    C: Clock + Clone,
{
    #[builder]
    pub fn new(
        #[builder(into)] registry: Arc<ChainRegistry>,
        store: S,
        attestation_provider: A,
        clock: C,
        #[builder(default)] config: OrchestratorConfig,
        #[builder(default)] extractors: ExtractorChain,
    ) -> Self {
        let queue = Arc::new(SubmissionQueue::new());

        Self {
            registry,
            clients: HashMap::new(),
            store,
            token_ops: TokenOps::new(clock.clone(), queue.clone(), config.confirmation),
            burns: BurnSubmitter::new(
                clock.clone(),
                queue.clone(),
                config.retry,
                config.confirmation,
            )
            .with_extractors(extractors),
            mints: MintSubmitter::new(clock.clone(), queue, config.retry, config.confirmation),
            poller: AttestationPoller::new(attestation_provider, clock.clone(), config.polling),
            clock,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the signing client for `network`.
    pub fn with_client(mut self, network: NamedChain, client: Arc<dyn ChainClient>) -> Self {
        self.clients.insert(network, client);
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validates the request and persists a new record in `IDLE`.
    ///
    /// Nothing touches a chain until the transfer is advanced.
    pub async fn initiate_transfer(&self, request: TransferRequest) -> Result<TransferId> {
        self.validate(&request)?;

        let now = self.clock.now();
        let id = TransferId::new();
        let deadline = self.config.budgets.deadline_for(TransferState::Idle, now);
        let record = TransferRecord::new(id, request, now, deadline);
        self.store.save(&record).await?;

        info!(
            transfer_id = %id,
            source_network = %record.request().source_network(),
            destination_network = %record.request().destination_network(),
            amount = %record.request().amount(),
            event = "transfer_initiated"
        );
        Ok(id)
    }

    pub async fn get_status(&self, id: TransferId) -> Result<TransferRecord> {
        self.load(id).await
    }

    /// Cancels a transfer that has not started burning.
    ///
    /// Returns `false` (and changes nothing) once the transfer is at or past
    /// `BURNING`, or already terminal.
    pub async fn cancel_transfer(&self, id: TransferId) -> Result<bool> {
        let lock = self.record_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.load(id).await?;
        if !record.state().is_cancellable() {
            info!(
                transfer_id = %id,
                state = %record.state(),
                event = "transfer_cancel_refused"
            );
            return Ok(false);
        }

        record.fail(&TransferError::Cancelled, self.clock.now())?;
        self.store.save(&record).await?;
        info!(transfer_id = %id, event = "transfer_cancelled");
        Ok(true)
    }

    /// Performs at most one state transition.
    ///
    /// Failures of the step itself are recorded on the transfer (which moves
    /// to `FAILED`) and reported through the returned outcome; only store
    /// errors and unknown ids are returned as `Err`.
    pub async fn advance(&self, id: TransferId) -> Result<StepOutcome> {
        let lock = self.record_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.load(id).await?;
        let from = record.state();
        if from.is_terminal() {
            return Ok(StepOutcome::Terminal(from));
        }
        if from == TransferState::ReconciliationRequired {
            return Ok(StepOutcome::AwaitingOperator);
        }

        async {
            match self.step(&mut record).await {
                Ok(()) => {}
                Err(e @ TransferError::Storage(_)) => return Err(e),
                Err(e) => self.record_failure(&mut record, e)?,
            }
            self.store.save(&record).await
        }
        .instrument(spans::advance(id, from))
        .await?;

        Ok(StepOutcome::Advanced {
            from,
            to: record.state(),
        })
    }

    /// Advances until the transfer is terminal or needs an operator.
    pub async fn drive(&self, id: TransferId) -> Result<TransferRecord> {
        loop {
            match self.advance(id).await? {
                StepOutcome::Advanced { .. } => continue,
                StepOutcome::AwaitingOperator | StepOutcome::Terminal(_) => {
                    return self.load(id).await
                }
            }
        }
    }

    /// Ids of all non-terminal transfers, oldest first. Used after a restart
    /// to find work to resume.
    pub async fn pending_transfers(&self) -> Result<Vec<TransferId>> {
        let mut pending: Vec<_> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|record| !record.state().is_terminal())
            .collect();
        pending.sort_by_key(|record| record.started_at());
        Ok(pending.into_iter().map(|record| record.id()).collect())
    }

    /// Resolves a `RECONCILIATION_REQUIRED` transfer with data an operator
    /// established out of band, moving it to `BURNED`.
    ///
    /// `burn_tx_hash` may be omitted only if the record already holds one. A
    /// hash that conflicts with the recorded one is rejected.
    pub async fn resolve_reconciliation(
        &self,
        id: TransferId,
        burn_tx_hash: Option<TxHash>,
        transfer_identifier: TransferIdentifier,
    ) -> Result<TransferRecord> {
        let lock = self.record_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.load(id).await?;
        if record.state() != TransferState::ReconciliationRequired {
            return Err(TransferError::InvalidTransition(format!(
                "transfer {id} is {}, not RECONCILIATION_REQUIRED",
                record.state()
            )));
        }

        let now = self.clock.now();
        if let Some(tx_hash) = burn_tx_hash {
            record.set_burn_tx_hash(tx_hash, now)?;
        }
        if record.burn_tx_hash().is_none() {
            return Err(TransferError::Validation(
                "a burn transaction hash is required to resolve reconciliation".to_string(),
            ));
        }

        record.set_transfer_identifier(transfer_identifier, now)?;
        record.set_burn_submission_started(false, now);
        self.enter(&mut record, TransferState::Burned)?;
        self.store.save(&record).await?;

        info!(
            transfer_id = %id,
            identifier = %transfer_identifier,
            event = "reconciliation_resolved"
        );
        Ok(record)
    }

    /// Reopens a transfer that failed with a retryable error in the state it
    /// failed in, with a fresh deadline.
    pub async fn resume_transfer(&self, id: TransferId) -> Result<TransferState> {
        let lock = self.record_lock(id).await;
        let _guard = lock.lock().await;

        let mut record = self.load(id).await?;
        let now = self.clock.now();
        let budgets = self.config.budgets;
        let state = record.reopen(now, |state| budgets.deadline_for(state, now))?;
        self.store.save(&record).await?;

        info!(
            transfer_id = %id,
            state = %state,
            resumptions = record.resumptions(),
            event = "transfer_resumed"
        );
        Ok(state)
    }

    async fn step(&self, record: &mut TransferRecord) -> Result<()> {
        let state = record.state();

        // The poller enforces its own deadline and polls at least once.
        if state != TransferState::AwaitingAttestation
            && record.is_deadline_exceeded(self.clock.now())
        {
            return Err(TransferError::DeadlineExceeded {
                state: state.to_string(),
            });
        }

        match state {
            TransferState::Idle => self.enter(record, TransferState::CheckingBalance),
            TransferState::CheckingBalance => self.check_balance(record).await,
            TransferState::Approving => self.approve(record).await,
            TransferState::Approved => self.enter(record, TransferState::Burning),
            TransferState::Burning => self.burn(record).await,
            TransferState::Burned => self.enter(record, TransferState::AwaitingAttestation),
            TransferState::AwaitingAttestation => self.await_attestation(record).await,
            TransferState::Attested => self.enter(record, TransferState::Minting),
            TransferState::Minting => self.mint(record).await,
            TransferState::ReconciliationRequired
            | TransferState::Completed
            | TransferState::Failed => Err(TransferError::InvalidTransition(format!(
                "no automatic step out of {state}"
            ))),
        }
    }

    async fn check_balance(&self, record: &mut TransferRecord) -> Result<()> {
        let (network, client) = self.endpoint(record.request().source_network())?;
        let owner = client.sender();
        let amount = record.request().amount();

        let check = with_retry(
            &self.clock,
            &self.config.retry,
            "check_balance_and_allowance",
            || {
                self.token_ops
                    .check_balance_and_allowance(client.as_ref(), &network, owner, amount)
            },
        )
        .await?;

        if !check.has_balance {
            return Err(TransferError::InsufficientFunds {
                balance: check.balance,
                required: amount,
            });
        }

        let next = if check.has_allowance {
            TransferState::Burning
        } else {
            TransferState::Approving
        };
        self.enter(record, next)
    }

    async fn approve(&self, record: &mut TransferRecord) -> Result<()> {
        let (network, client) = self.endpoint(record.request().source_network())?;
        let amount = record.request().amount();

        let tx_hash = with_retry(&self.clock, &self.config.retry, "approve", || {
            self.token_ops.approve(client.as_ref(), &network, amount)
        })
        .await?;

        if let Some(tx_hash) = tx_hash {
            record.set_approve_tx_hash(tx_hash, self.clock.now());
        }
        self.enter(record, TransferState::Approved)
    }

    async fn burn(&self, record: &mut TransferRecord) -> Result<()> {
        let (network, client) = self.endpoint(record.request().source_network())?;
        let destination = *self.registry.get(record.request().destination_network())?;

        let tx_hash = match record.burn_tx_hash() {
            Some(tx_hash) => tx_hash,
            None if record.burn_submission_started() => {
                // Interrupted between send and persisting the hash: the burn
                // may or may not exist on chain.
                let err = TransferError::ProtocolMismatch(
                    "burn submission was interrupted before its hash was recorded".to_string(),
                );
                warn!(transfer_id = %record.id(), event = "burn_outcome_unknown");
                record.note_error(&err, self.clock.now());
                return self.enter(record, TransferState::ReconciliationRequired);
            }
            None => {
                let call = self.burn_call(record, &network, &destination)?;

                record.set_burn_submission_started(true, self.clock.now());
                self.store.save(record).await?;

                match self.burns.submit(client.as_ref(), &network, &call, None).await {
                    Ok(tx_hash) => {
                        let now = self.clock.now();
                        record.set_burn_tx_hash(tx_hash, now)?;
                        record.set_burn_submission_started(false, now);
                        self.store.save(record).await?;
                        tx_hash
                    }
                    Err(e) => {
                        record.set_burn_submission_started(false, self.clock.now());
                        return Err(e);
                    }
                }
            }
        };

        let outcome = self
            .burns
            .confirm(client.as_ref(), &network, destination.domain_id, tx_hash)
            .await?;

        match outcome.transfer_identifier {
            Some(identifier) => {
                record.set_transfer_identifier(identifier, self.clock.now())?;
                self.enter(record, TransferState::Burned)
            }
            None => {
                let err = TransferError::ProtocolMismatch(format!(
                    "burn {tx_hash} confirmed but no transfer identifier could be derived"
                ));
                warn!(
                    transfer_id = %record.id(),
                    tx_hash = %tx_hash,
                    event = "transfer_identifier_missing"
                );
                record.note_error(&err, self.clock.now());
                self.enter(record, TransferState::ReconciliationRequired)
            }
        }
    }

    async fn await_attestation(&self, record: &mut TransferRecord) -> Result<()> {
        let source = *self.registry.get(record.request().source_network())?;
        let burn_tx_hash = record.burn_tx_hash().ok_or_else(|| {
            TransferError::InvalidTransition("awaiting attestation without a burn".to_string())
        })?;

        match self
            .poller
            .await_attestation(burn_tx_hash, source.domain_id, record.deadline())
            .await?
        {
            AttestationResult::Complete { message, signature } => {
                record.set_attestation(message, signature, self.clock.now())?;
                self.enter(record, TransferState::Attested)
            }
            AttestationResult::Pending => Err(TransferError::AttestationTimeout),
        }
    }

    async fn mint(&self, record: &mut TransferRecord) -> Result<()> {
        let (network, client) = self.endpoint(record.request().destination_network())?;
        let (message, signature) = record
            .attestation()
            .map(|(message, signature)| (message.clone(), signature.clone()))
            .ok_or_else(|| {
                TransferError::InvalidTransition("minting without an attestation".to_string())
            })?;

        let tx_hash = match record.mint_tx_hash() {
            Some(tx_hash) => Some(tx_hash),
            None => {
                if record.mint_submission_started() {
                    warn!(transfer_id = %record.id(), event = "mint_resubmission_after_interruption");
                }

                record.set_mint_submission_started(true, self.clock.now());
                self.store.save(record).await?;

                let submission = self
                    .mints
                    .submit(client.as_ref(), &network, &message, &signature, None)
                    .await;
                let now = self.clock.now();
                record.set_mint_submission_started(false, now);

                match submission? {
                    MintSubmission::Submitted(tx_hash) | MintSubmission::AlreadySubmitted(tx_hash) => {
                        record.set_mint_tx_hash(tx_hash, now)?;
                        self.store.save(record).await?;
                        Some(tx_hash)
                    }
                    MintSubmission::AlreadyReceived => None,
                }
            }
        };

        if let Some(tx_hash) = tx_hash {
            if let Err(e) = self.mints.confirm(client.as_ref(), &network, tx_hash).await {
                // A revert because someone else relayed the message first
                // still means the funds arrived.
                let minted_elsewhere = matches!(e, TransferError::UnrecoverableSubmission { .. })
                    && self
                        .mints
                        .is_received(client.as_ref(), &network, &message)
                        .await?;
                if !minted_elsewhere {
                    return Err(e);
                }
                warn!(
                    transfer_id = %record.id(),
                    tx_hash = %tx_hash,
                    event = "mint_reverted_message_already_received"
                );
            }
        }

        self.enter(record, TransferState::Completed)
    }

    fn burn_call(
        &self,
        record: &TransferRecord,
        source: &NetworkConfig,
        destination: &NetworkConfig,
    ) -> Result<BurnCall> {
        let request = record.request();
        Ok(BurnCall::builder()
            .amount(request.amount())
            .destination_domain(destination.domain_id)
            .mint_recipient(request.mint_recipient()?)
            .burn_token(source.token_contract)
            .max_fee(self.config.max_fee)
            .min_finality_threshold(self.config.finality_threshold)
            .build())
    }

    fn enter(&self, record: &mut TransferRecord, next: TransferState) -> Result<()> {
        let now = self.clock.now();
        let from = record.state();
        record.transition_to(next, now, self.config.budgets.deadline_for(next, now))?;

        info!(
            transfer_id = %record.id(),
            from = %from,
            to = %next,
            event = "transfer_state_changed"
        );
        Ok(())
    }

    fn record_failure(&self, record: &mut TransferRecord, error: TransferError) -> Result<()> {
        spans::record_error_with_context(
            &format!("{:?}", error.kind()),
            &error.to_string(),
            Some(record.state().as_str()),
        );
        error!(
            transfer_id = %record.id(),
            state = %record.state(),
            error = %error,
            retryable = error.is_retryable(),
            event = "transfer_failed"
        );
        record.fail(&error, self.clock.now())
    }

    fn validate(&self, request: &TransferRequest) -> Result<()> {
        if request.amount().is_zero() {
            return Err(TransferError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if request.source_network() == request.destination_network() {
            return Err(TransferError::Validation(format!(
                "source and destination are both {}",
                request.source_network()
            )));
        }

        self.endpoint(request.source_network())?;
        self.endpoint(request.destination_network())?;
        request.recipient_address()?;
        Ok(())
    }

    fn endpoint(&self, network: NamedChain) -> Result<(NetworkConfig, Arc<dyn ChainClient>)> {
        let config = *self.registry.get(network)?;
        let client = self.clients.get(&network).cloned().ok_or_else(|| {
            TransferError::Validation(format!("no chain client registered for {network}"))
        })?;
        Ok((config, client))
    }

    async fn load(&self, id: TransferId) -> Result<TransferRecord> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| TransferError::NotFound(id.to_string()))
    }

    async fn record_lock(&self, id: TransferId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(&id).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(id, Arc::downgrade(&lock));
        lock
    }

    /// Current time on the orchestrator's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
