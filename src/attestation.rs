//! Attestation polling.
//!
//! Polls the attestation service for the message emitted by a burn until it
//! is signed or the caller's deadline passes. The poller is read-only: it
//! never touches transfer records.

use alloy_primitives::TxHash;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

use crate::config::PollingConfig;
use crate::error::{Result, TransferError};
use crate::protocol::{AttestationResult, DomainId};
use crate::spans;
use crate::traits::{AttestationProvider, Clock};
use crate::transfer::Timestamp;

#[derive(Debug, Clone)]
pub struct AttestationPoller<A, C> {
    provider: A,
    clock: C,
    config: PollingConfig,
}

impl<A: AttestationProvider, C: Clock> AttestationPoller<A, C> {
    pub fn new(provider: A, clock: C, config: PollingConfig) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    /// A single request. Returns [`AttestationResult::Pending`] while the
    /// message is unsigned or not yet indexed.
    pub async fn poll_once(
        &self,
        burn_tx_hash: TxHash,
        source_domain: DomainId,
    ) -> Result<AttestationResult> {
        let response = match self.provider.get_messages(source_domain, burn_tx_hash).await {
            Ok(response) => response,
            Err(TransferError::AttestationNotFound) => return Ok(AttestationResult::Pending),
            Err(e) => return Err(e),
        };

        Ok(response
            .messages
            .into_iter()
            .next()
            .map(|message| message.into_result())
            .unwrap_or(AttestationResult::Pending))
    }

    /// Polls until the attestation is complete or `deadline` passes.
    ///
    /// Sleeps are clipped to the time left before the deadline, so the call
    /// returns [`TransferError::AttestationTimeout`] no later than one poll
    /// interval after it. At least one request is made even if the deadline
    /// has already passed. Rate limiting backs off for the advertised
    /// Retry-After; a rejected request fails immediately.
    pub async fn await_attestation(
        &self,
        burn_tx_hash: TxHash,
        source_domain: DomainId,
        deadline: Timestamp,
    ) -> Result<AttestationResult> {
        let span = spans::await_attestation(
            burn_tx_hash,
            source_domain,
            deadline,
            self.config.poll_interval.as_secs(),
        );

        async {
            let grace = self.config.initial_delay.min(self.remaining(deadline));
            if !grace.is_zero() {
                debug!(delay_secs = grace.as_secs(), event = "attestation_initial_delay");
                self.clock.sleep(grace).await;
            }

            let mut attempt = 0u32;
            loop {
                attempt += 1;

                let mut wait = self.config.poll_interval;
                let outcome = self
                    .poll_once(burn_tx_hash, source_domain)
                    .instrument(spans::poll_attestation(attempt))
                    .await;

                match outcome {
                    Ok(result @ AttestationResult::Complete { .. }) => {
                        info!(attempt = attempt, event = "attestation_complete");
                        return Ok(result);
                    }
                    Ok(AttestationResult::Pending) => {
                        debug!(attempt = attempt, event = "attestation_pending");
                    }
                    Err(TransferError::RateLimited {
                        retry_after_seconds,
                    }) => {
                        warn!(
                            attempt = attempt,
                            retry_after_secs = retry_after_seconds,
                            event = "attestation_rate_limited"
                        );
                        wait = wait.max(Duration::from_secs(retry_after_seconds));
                    }
                    Err(e @ TransferError::AttestationRejected { .. }) => {
                        spans::record_error_with_context(
                            "AttestationRejected",
                            &e.to_string(),
                            None,
                        );
                        return Err(e);
                    }
                    Err(e) => {
                        // Server errors and undecodable bodies: keep polling.
                        warn!(attempt = attempt, error = %e, event = "attestation_poll_failed");
                    }
                }

                let remaining = self.remaining(deadline);
                if remaining.is_zero() {
                    warn!(attempts = attempt, event = "attestation_timeout");
                    return Err(TransferError::AttestationTimeout);
                }

                self.clock.sleep(wait.min(remaining)).await;
            }
        }
        .instrument(span)
        .await
    }

    fn remaining(&self, deadline: Timestamp) -> Duration {
        deadline.saturating_duration_since(self.clock.now())
    }
}
