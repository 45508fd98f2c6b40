//! Span helpers for transfer operations
//!
//! Static span names with structured attributes, kept out of the business
//! logic. The orchestrator attaches these with [`tracing::Instrument`] so a
//! subscriber sees one `cctp.advance` span per state step with the submission
//! and polling spans nested beneath it.
//!
//! # Example
//!
//! ```rust,no_run
//! use cctp_orchestrator::{spans, TransferId, TransferState};
//! use tracing::Instrument;
//!
//! # async fn example() {
//! let id = TransferId::new();
//! async {
//!     // custom step logic
//! }
//! .instrument(spans::advance(id, TransferState::Burning))
//! .await;
//! # }
//! ```

use alloy_chains::NamedChain;
use alloy_primitives::{Address, TxHash, U256};
use tracing::Span;

use crate::protocol::DomainId;
use crate::transfer::{Timestamp, TransferId, TransferState};

/// Span for one state step of one transfer.
///
/// Parent: caller's span
/// Children: submission, confirmation and attestation spans
#[inline]
pub fn advance(transfer_id: TransferId, state: TransferState) -> Span {
    tracing::info_span!(
        "cctp.advance",
        transfer_id = %transfer_id,
        state = %state,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Span for the approval of the burn contract as token spender.
#[inline]
pub fn approve(network: NamedChain, owner: Address, spender: Address, amount: U256) -> Span {
    tracing::info_span!(
        "cctp.approve",
        network = %network,
        owner = %owner,
        spender = %spender,
        amount = %amount,
    )
}

/// Span for the burn submission and its confirmation.
#[inline]
pub fn burn(
    network: NamedChain,
    sender: Address,
    destination_domain: DomainId,
    amount: U256,
) -> Span {
    tracing::info_span!(
        "cctp.burn",
        network = %network,
        sender = %sender,
        destination_domain = %destination_domain,
        amount = %amount,
    )
}

/// Span for the mint submission on the destination network.
#[inline]
pub fn mint(network: NamedChain, message_len: usize, attestation_len: usize) -> Span {
    tracing::info_span!(
        "cctp.mint",
        network = %network,
        message_len_bytes = message_len,
        attestation_len_bytes = attestation_len,
    )
}

/// Span for polling the attestation service until completion or deadline.
///
/// Children: cctp.poll_attestation (one per request)
#[inline]
pub fn await_attestation(
    burn_tx_hash: TxHash,
    source_domain: DomainId,
    deadline: Timestamp,
    poll_interval_secs: u64,
) -> Span {
    tracing::info_span!(
        "cctp.await_attestation",
        burn_tx_hash = %burn_tx_hash,
        source_domain = %source_domain,
        deadline = %deadline,
        poll_interval_secs = poll_interval_secs,
    )
}

/// Span for a single attestation request.
#[inline]
pub fn poll_attestation(attempt: u32) -> Span {
    tracing::debug_span!("cctp.poll_attestation", attempt = attempt)
}

/// Span for waiting until a submitted transaction is mined.
#[inline]
pub fn wait_for_confirmation(tx_hash: TxHash, network: NamedChain) -> Span {
    tracing::debug_span!(
        "cctp.wait_for_confirmation",
        tx_hash = %tx_hash,
        network = %network,
    )
}

/// Record error attributes with custom context on the current span.
///
/// # Example
///
/// ```rust,no_run
/// use cctp_orchestrator::spans;
///
/// let span = tracing::info_span!("cctp.operation");
/// let _guard = span.enter();
///
/// spans::record_error_with_context(
///     "ConfirmationTimeout",
///     "burn not mined in time",
///     Some("hash persisted, will re-check on resume"),
/// );
/// ```
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = tracing::Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
