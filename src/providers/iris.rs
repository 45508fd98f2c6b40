//! Circle Iris API attestation provider implementation.

use alloy_primitives::TxHash;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, trace};
use url::Url;

use crate::config::{IRIS_API, IRIS_API_SANDBOX, MESSAGES_PATH_V2};
use crate::error::{Result, TransferError};
use crate::protocol::{DomainId, MessagesResponse};
use crate::traits::AttestationProvider;

/// Retry-After fallback when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Attestation provider backed by Circle's Iris API.
///
/// # Examples
///
/// ```rust,no_run
/// use alloy_primitives::TxHash;
/// use cctp_orchestrator::providers::IrisAttestationProvider;
/// use cctp_orchestrator::traits::AttestationProvider;
/// use cctp_orchestrator::DomainId;
///
/// # async fn example() -> cctp_orchestrator::Result<()> {
/// let provider = IrisAttestationProvider::production();
/// let response = provider
///     .get_messages(DomainId::Ethereum, TxHash::ZERO)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IrisAttestationProvider {
    base_url: String,
    client: Client,
}

impl IrisAttestationProvider {
    /// Creates a provider for an arbitrary Iris deployment, e.g. a mock server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    pub fn production() -> Self {
        Self::new(IRIS_API)
    }

    pub fn sandbox() -> Self {
        Self::new(IRIS_API_SANDBOX)
    }

    /// `{base}/v2/messages/{domain}?transactionHash={tx_hash}`
    pub fn messages_url(&self, source_domain: DomainId, tx_hash: TxHash) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join(&format!("{MESSAGES_PATH_V2}{}", source_domain.as_u32())))
            .map_err(|e| TransferError::InvalidConfig(format!("Iris URL {}: {e}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("transactionHash", &tx_hash.to_string());
        Ok(url)
    }
}

#[async_trait]
impl AttestationProvider for IrisAttestationProvider {
    #[instrument(skip(self), fields(source_domain = %source_domain, tx_hash = %tx_hash))]
    async fn get_messages(
        &self,
        source_domain: DomainId,
        tx_hash: TxHash,
    ) -> Result<MessagesResponse> {
        let url = self.messages_url(source_domain, tx_hash)?;
        trace!(url = %url, event = "iris_request");

        let response = self.client.get(url).send().await.map_err(|e| {
            TransferError::TransientNetwork(format!("Iris request failed: {e}"))
        })?;

        let status = response.status();
        trace!(status_code = status.as_u16(), event = "iris_response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            debug!(retry_after_seconds = retry_after, event = "iris_rate_limited");
            return Err(TransferError::RateLimited {
                retry_after_seconds: retry_after,
            });
        }

        if status == StatusCode::NOT_FOUND {
            debug!(event = "iris_message_not_found");
            return Err(TransferError::AttestationNotFound);
        }

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::AttestationRejected {
                reason: format!("{status}: {body}"),
            });
        }

        if !status.is_success() {
            return Err(TransferError::TransientNetwork(format!(
                "Iris returned {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            TransferError::TransientNetwork(format!("Iris body read failed: {e}"))
        })?;
        let messages: MessagesResponse = serde_json::from_str(&body)?;

        debug!(
            message_count = messages.messages.len(),
            event = "iris_messages_parsed"
        );
        Ok(messages)
    }
}
