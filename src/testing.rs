//! Test utilities and fake implementations of the trait seams.
//!
//! The fakes keep all state in memory behind `Arc<Mutex<_>>`, so clones share
//! state and a test can inspect what the orchestrator did after the fact:
//! how many burns were sent, how long the clock slept, how often the
//! attestation service was asked.
//!
//! They cover the adversarial paths as well as the happy one: transient RPC
//! failures, reverts, approvals that do not take effect, burn receipts
//! without a usable `MessageSent` log, rate limiting and attestations that
//! never arrive.

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, Log, TxHash, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::burn::BurnCall;
use crate::chain::CCTP_V2_MESSAGE_TRANSMITTER_MAINNET;
use crate::contracts::v2::MessageSent;
use crate::error::{Result, TransferError};
use crate::protocol::{
    AttestationStatus, DomainId, IrisMessage, MessageHeader, MessagesResponse,
};
use crate::traits::{AttestationProvider, ChainClient, Clock, TxReceipt};
use crate::transfer::Timestamp;

// ============================================================================
// Message helpers
// ============================================================================

fn build_message(
    source: DomainId,
    destination: DomainId,
    nonce: FixedBytes<32>,
    sender: FixedBytes<32>,
    recipient: FixedBytes<32>,
    body: &[u8],
) -> Bytes {
    let header = MessageHeader {
        version: 1,
        source_domain: source,
        destination_domain: destination,
        nonce,
        sender,
        recipient,
        destination_caller: FixedBytes::ZERO,
        min_finality_threshold: 2000,
        finality_threshold_executed: 0,
    };

    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(body);
    Bytes::from(bytes)
}

/// A message as emitted on the source chain: valid header, zero nonce.
pub fn fake_source_message(source: DomainId, destination: DomainId) -> Bytes {
    build_message(
        source,
        destination,
        FixedBytes::ZERO,
        FixedBytes::repeat_byte(0x01),
        FixedBytes::repeat_byte(0x02),
        &[0u8; 32],
    )
}

/// A message as returned by the attestation service for `burn_tx_hash`,
/// with a nonce derived from the hash.
pub fn fake_attested_message(
    source: DomainId,
    destination: DomainId,
    burn_tx_hash: TxHash,
) -> Bytes {
    build_message(
        source,
        destination,
        keccak256(burn_tx_hash),
        FixedBytes::repeat_byte(0x01),
        FixedBytes::repeat_byte(0x02),
        burn_tx_hash.as_slice(),
    )
}

/// A 65-byte signature-shaped attestation.
pub fn fake_attestation_signature(burn_tx_hash: TxHash) -> Bytes {
    let mut bytes = keccak256(burn_tx_hash).to_vec();
    bytes.extend_from_slice(keccak256(keccak256(burn_tx_hash)).as_slice());
    bytes.push(0x1b);
    Bytes::from(bytes)
}

// ============================================================================
// Fake Chain Client
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    Approve,
    Burn,
    Mint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub kind: SubmissionKind,
    pub tx_hash: TxHash,
}

/// What a fake burn receipt contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BurnLogMode {
    /// Canonical `MessageSent(bytes)` log
    #[default]
    MessageSent,
    /// The message payload under an unknown event signature
    RenamedEvent,
    /// A canonical `MessageSent` log, but emitted by the token messenger
    /// instead of the message transmitter
    ForeignEmitter,
    /// No logs at all
    NoLogs,
}

#[derive(Debug, Default)]
struct ChainState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    receipts: HashMap<TxHash, TxReceipt>,
    submissions: Vec<Submission>,
    received_nonces: HashSet<FixedBytes<32>>,
    failing_sends: u32,
    failing_reads: u32,
    delayed_receipts: u32,
    withhold_receipts: bool,
    ineffective_approvals: bool,
    revert_next: Option<SubmissionKind>,
    burn_log_mode: BurnLogMode,
    tx_counter: u64,
}

/// In-memory chain for one network and one signing account.
///
/// Receipts are available as soon as a transaction is submitted unless
/// delayed or withheld. Burns revert like the real token messenger when the
/// balance or allowance no longer covers them.
#[derive(Debug, Clone)]
pub struct FakeChainClient {
    domain: DomainId,
    sender: Address,
    message_transmitter: Address,
    state: Arc<Mutex<ChainState>>,
}

impl FakeChainClient {
    pub fn new(domain: DomainId) -> Self {
        Self {
            domain,
            sender: Address::repeat_byte(0x5e),
            message_transmitter: CCTP_V2_MESSAGE_TRANSMITTER_MAINNET,
            state: Arc::new(Mutex::new(ChainState::default())),
        }
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Contract that emits `MessageSent` for burns.
    pub fn with_message_transmitter(mut self, message_transmitter: Address) -> Self {
        self.message_transmitter = message_transmitter;
        self
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    /// The next `count` submissions fail with a transient network error.
    pub fn fail_next_sends(&self, count: u32) {
        self.state.lock().unwrap().failing_sends = count;
    }

    /// The next `count` reads fail with a transient network error.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().unwrap().failing_reads = count;
    }

    /// The next `count` receipt lookups report the transaction as pending.
    pub fn delay_receipts(&self, count: u32) {
        self.state.lock().unwrap().delayed_receipts = count;
    }

    /// Receipt lookups report every transaction as pending until re-enabled.
    pub fn withhold_receipts(&self, withhold: bool) {
        self.state.lock().unwrap().withhold_receipts = withhold;
    }

    /// Approvals confirm but leave the allowance untouched.
    pub fn make_approvals_ineffective(&self) {
        self.state.lock().unwrap().ineffective_approvals = true;
    }

    /// The next submission of `kind` is mined as reverted.
    pub fn revert_next(&self, kind: SubmissionKind) {
        self.state.lock().unwrap().revert_next = Some(kind);
    }

    pub fn set_burn_log_mode(&self, mode: BurnLogMode) {
        self.state.lock().unwrap().burn_log_mode = mode;
    }

    pub fn mark_message_received(&self, nonce: FixedBytes<32>) {
        self.state.lock().unwrap().received_nonces.insert(nonce);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn approve_count(&self) -> usize {
        self.count(SubmissionKind::Approve)
    }

    pub fn burn_count(&self) -> usize {
        self.count(SubmissionKind::Burn)
    }

    pub fn mint_count(&self) -> usize {
        self.count(SubmissionKind::Mint)
    }

    fn count(&self, kind: SubmissionKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .submissions
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    fn check_read(state: &mut ChainState) -> Result<()> {
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(TransferError::TransientNetwork(
                "simulated RPC read failure".to_string(),
            ));
        }
        Ok(())
    }

    /// Records a submission and its receipt. Returns the new hash.
    fn record(
        &self,
        state: &mut ChainState,
        kind: SubmissionKind,
        logs: Vec<Log>,
        success: bool,
    ) -> TxHash {
        state.tx_counter += 1;
        let tx_hash = keccak256(format!(
            "{}:{}:{}",
            self.domain.as_u32(),
            self.sender,
            state.tx_counter
        ));
        state.submissions.push(Submission { kind, tx_hash });
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: Some(state.tx_counter),
                success,
                logs,
            },
        );
        tx_hash
    }

    fn begin_send(state: &mut ChainState, kind: SubmissionKind) -> Result<bool> {
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(TransferError::TransientNetwork(
                "simulated RPC send failure".to_string(),
            ));
        }
        let reverts = state.revert_next == Some(kind);
        if reverts {
            state.revert_next = None;
        }
        Ok(!reverts)
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        Self::check_read(&mut state)?;
        Ok(state
            .balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        Self::check_read(&mut state)?;
        Ok(state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn submit_approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let mut state = self.state.lock().unwrap();
        let success = Self::begin_send(&mut state, SubmissionKind::Approve)?;

        if success && !state.ineffective_approvals {
            state
                .allowances
                .insert((token, self.sender, spender), amount);
        }

        Ok(self.record(&mut state, SubmissionKind::Approve, Vec::new(), success))
    }

    async fn submit_burn(&self, burn_contract: Address, call: &BurnCall) -> Result<TxHash> {
        let mut state = self.state.lock().unwrap();
        let mut success = Self::begin_send(&mut state, SubmissionKind::Burn)?;

        let key = (call.burn_token, self.sender);
        let balance = state.balances.get(&key).copied().unwrap_or_default();
        let allowance_key = (call.burn_token, self.sender, burn_contract);
        let allowance = state
            .allowances
            .get(&allowance_key)
            .copied()
            .unwrap_or_default();
        success &= balance >= call.amount && allowance >= call.amount;

        let mut logs = Vec::new();
        if success {
            state.balances.insert(key, balance - call.amount);
            state.allowances.insert(allowance_key, allowance - call.amount);

            // Source-chain messages carry no nonce: identical burns emit
            // identical bytes.
            let mut body = call.amount.to_be_bytes::<32>().to_vec();
            body.extend_from_slice(&call.max_fee.to_be_bytes::<32>());
            let message = build_message(
                self.domain,
                call.destination_domain,
                FixedBytes::ZERO,
                self.sender.into_word(),
                call.mint_recipient,
                &body,
            );
            let data = MessageSent { message }.encode_data();

            let emitted = match state.burn_log_mode {
                BurnLogMode::MessageSent => {
                    Some((self.message_transmitter, MessageSent::SIGNATURE_HASH))
                }
                BurnLogMode::RenamedEvent => Some((
                    self.message_transmitter,
                    keccak256("MessageDispatched(bytes)"),
                )),
                BurnLogMode::ForeignEmitter => Some((burn_contract, MessageSent::SIGNATURE_HASH)),
                BurnLogMode::NoLogs => None,
            };
            if let Some((emitter, topic)) = emitted {
                logs.push(Log::new_unchecked(emitter, vec![topic], data.into()));
            }
        }

        Ok(self.record(&mut state, SubmissionKind::Burn, logs, success))
    }

    async fn submit_mint(
        &self,
        _mint_contract: Address,
        message: Bytes,
        _attestation: Bytes,
    ) -> Result<TxHash> {
        let mut state = self.state.lock().unwrap();
        let mut success = Self::begin_send(&mut state, SubmissionKind::Mint)?;

        if success {
            match MessageHeader::decode(&message).and_then(|h| h.assigned_nonce()) {
                // Replays revert on chain.
                Some(nonce) => success = state.received_nonces.insert(nonce),
                None => success = false,
            }
        }

        Ok(self.record(&mut state, SubmissionKind::Mint, Vec::new(), success))
    }

    async fn is_message_received(
        &self,
        _mint_contract: Address,
        nonce: FixedBytes<32>,
    ) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Self::check_read(&mut state)?;
        Ok(state.received_nonces.contains(&nonce))
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let mut state = self.state.lock().unwrap();
        Self::check_read(&mut state)?;

        if state.withhold_receipts {
            return Ok(None);
        }
        if state.delayed_receipts > 0 {
            state.delayed_receipts -= 1;
            return Ok(None);
        }

        Ok(state.receipts.get(&tx_hash).cloned())
    }
}

// ============================================================================
// Fake Attestation Provider
// ============================================================================

/// Scripted behavior of the fake attestation service for one burn.
///
/// Counts are 1-based request numbers: `PendingFor(3)` answers pending to the
/// first three requests and complete from the fourth on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttestationScript {
    #[default]
    CompleteImmediately,
    PendingFor(u32),
    NotFoundFor(u32),
    /// `(requests, retry_after_seconds)`
    RateLimitedFor(u32, u64),
    ServerErrorFor(u32),
    /// Pending until the shared [`FakeClock`] reaches the instant
    CompleteAt(Timestamp),
    NeverComplete,
    Reject(String),
}

#[derive(Debug, Default)]
struct AttestationState {
    scripts: HashMap<TxHash, AttestationScript>,
    default_script: AttestationScript,
    calls: HashMap<TxHash, u32>,
}

/// A fake attestation service driven by [`AttestationScript`]s.
#[derive(Debug, Clone)]
pub struct FakeAttestationProvider {
    clock: FakeClock,
    destination_domain: DomainId,
    state: Arc<Mutex<AttestationState>>,
}

impl FakeAttestationProvider {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            clock,
            destination_domain: DomainId::Base,
            state: Arc::new(Mutex::new(AttestationState::default())),
        }
    }

    /// Destination domain written into attested messages.
    pub fn with_destination_domain(mut self, domain: DomainId) -> Self {
        self.destination_domain = domain;
        self
    }

    pub fn script(&self, burn_tx_hash: TxHash, script: AttestationScript) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(burn_tx_hash, script);
    }

    /// Script for burns without their own.
    pub fn set_default_script(&self, script: AttestationScript) {
        self.state.lock().unwrap().default_script = script;
    }

    pub fn call_count(&self, burn_tx_hash: TxHash) -> u32 {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&burn_tx_hash)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.state.lock().unwrap().calls.values().sum()
    }

    fn complete(&self, source: DomainId, burn_tx_hash: TxHash) -> MessagesResponse {
        MessagesResponse {
            messages: vec![IrisMessage {
                status: AttestationStatus::Complete,
                message: Some(fake_attested_message(
                    source,
                    self.destination_domain,
                    burn_tx_hash,
                )),
                attestation: Some(fake_attestation_signature(burn_tx_hash)),
            }],
        }
    }

    fn pending() -> MessagesResponse {
        MessagesResponse {
            messages: vec![IrisMessage {
                status: AttestationStatus::PendingConfirmations,
                message: None,
                attestation: None,
            }],
        }
    }
}

#[async_trait]
impl AttestationProvider for FakeAttestationProvider {
    async fn get_messages(
        &self,
        source_domain: DomainId,
        tx_hash: TxHash,
    ) -> Result<MessagesResponse> {
        let (call, script) = {
            let mut state = self.state.lock().unwrap();
            let calls = state.calls.entry(tx_hash).or_insert(0);
            *calls += 1;
            let call = *calls;
            let script = state
                .scripts
                .get(&tx_hash)
                .cloned()
                .unwrap_or_else(|| state.default_script.clone());
            (call, script)
        };

        match script {
            AttestationScript::CompleteImmediately => Ok(self.complete(source_domain, tx_hash)),
            AttestationScript::PendingFor(n) if call <= n => Ok(Self::pending()),
            AttestationScript::NotFoundFor(n) if call <= n => {
                Err(TransferError::AttestationNotFound)
            }
            AttestationScript::RateLimitedFor(n, retry_after_seconds) if call <= n => {
                Err(TransferError::RateLimited {
                    retry_after_seconds,
                })
            }
            AttestationScript::ServerErrorFor(n) if call <= n => Err(
                TransferError::TransientNetwork("simulated 503".to_string()),
            ),
            AttestationScript::CompleteAt(at) if self.clock.now() < at => Ok(Self::pending()),
            AttestationScript::NeverComplete => Ok(Self::pending()),
            AttestationScript::Reject(reason) => {
                Err(TransferError::AttestationRejected { reason })
            }
            _ => Ok(self.complete(source_domain, tx_hash)),
        }
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A fake clock that advances virtual time on `sleep`.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_time: Arc<Mutex<Timestamp>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at(Timestamp::from_unix_millis(1_700_000_000_000))
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(start: Timestamp) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fast-forward the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock().unwrap();
        *time = time.saturating_add(duration);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleep_log.lock().unwrap().clone()
    }

    /// Get the total time "slept" by this clock
    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }

    /// Get the number of times sleep was called
    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }

    pub fn clear_sleep_log(&self) {
        self.sleep_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn now(&self) -> Timestamp {
        *self.current_time.lock().unwrap()
    }
}
