//! Transfer identifier extraction from burn receipts.
//!
//! The identifier commits to the message bytes the message transmitter on
//! the source chain emits in `MessageSent`, plus the burn transaction and
//! the log's position in the receipt. Extraction is an ordered list of
//! strategies: decode the canonical event first, then fall back to scanning
//! the transmitter's other logs for a payload that decodes as a CCTP message
//! for this route. Logs from any other contract are ignored. Nothing is
//! synthesized when all strategies fail.

use alloy_primitives::{Address, Bytes, Log, TxHash};
use alloy_sol_types::SolEvent;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::contracts::v2::MessageSent;
use crate::protocol::{DomainId, MessageHeader};
use crate::transfer::TransferIdentifier;

/// What a strategy needs to know about the burn it inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionContext {
    pub burn_tx_hash: TxHash,
    /// Source network's message transmitter, the only trusted emitter
    pub message_transmitter: Address,
    pub source_domain: DomainId,
    pub destination_domain: DomainId,
}

impl ExtractionContext {
    /// Logs emitted by the message transmitter, paired with their position
    /// in the receipt.
    pub fn trusted_logs<'a>(&self, logs: &'a [Log]) -> impl Iterator<Item = (u64, &'a Log)> {
        let emitter = self.message_transmitter;
        logs.iter()
            .enumerate()
            .filter(move |(_, log)| log.address == emitter)
            .map(|(index, log)| (index as u64, log))
    }

    pub fn identifier(&self, log_index: u64, message: &Bytes) -> TransferIdentifier {
        TransferIdentifier::derive(self.burn_tx_hash, log_index, message)
    }
}

/// One way of deriving a [`TransferIdentifier`] from receipt logs.
pub trait IdentifierExtractor: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, logs: &[Log], context: &ExtractionContext) -> Option<TransferIdentifier>;
}

/// Decodes the transmitter's logs whose first topic is the
/// `MessageSent(bytes)` signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageSentExtractor;

impl IdentifierExtractor for MessageSentExtractor {
    fn name(&self) -> &'static str {
        "message_sent_event"
    }

    fn extract(&self, logs: &[Log], context: &ExtractionContext) -> Option<TransferIdentifier> {
        context
            .trusted_logs(logs)
            .filter(|(_, log)| log.topics().first() == Some(&MessageSent::SIGNATURE_HASH))
            .find_map(|(index, log)| {
                let message = MessageSent::abi_decode_data(&log.data.data).ok()?.0;
                Some(context.identifier(index, &message))
            })
    }
}

/// Ignores topics and tries each of the transmitter's logs as an
/// ABI-encoded `bytes` payload holding a CCTP message for the expected route.
///
/// Covers a renamed event or an upgraded transmitter that emits the message
/// under a different signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePayloadScan;

impl IdentifierExtractor for MessagePayloadScan {
    fn name(&self) -> &'static str {
        "message_payload_scan"
    }

    fn extract(&self, logs: &[Log], context: &ExtractionContext) -> Option<TransferIdentifier> {
        context.trusted_logs(logs).find_map(|(index, log)| {
            let message = MessageSent::abi_decode_data(&log.data.data).ok()?.0;
            let header = MessageHeader::decode(&message)?;

            (header.source_domain == context.source_domain
                && header.destination_domain == context.destination_domain)
                .then(|| context.identifier(index, &message))
        })
    }
}

/// Ordered fallback over several [`IdentifierExtractor`]s.
#[derive(Debug)]
pub struct ExtractorChain {
    extractors: Vec<Box<dyn IdentifierExtractor>>,
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(MessageSentExtractor),
            Box::new(MessagePayloadScan),
        ])
    }
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn IdentifierExtractor>>) -> Self {
        Self { extractors }
    }

    /// Returns the first identifier any strategy finds.
    pub fn extract(&self, logs: &[Log], context: &ExtractionContext) -> Option<TransferIdentifier> {
        for (position, extractor) in self.extractors.iter().enumerate() {
            if let Some(identifier) = extractor.extract(logs, context) {
                if position > 0 {
                    warn!(
                        strategy = extractor.name(),
                        identifier = %identifier,
                        event = "identifier_extracted_by_fallback"
                    );
                } else {
                    debug!(
                        strategy = extractor.name(),
                        identifier = %identifier,
                        event = "identifier_extracted"
                    );
                }
                return Some(identifier);
            }
        }

        warn!(log_count = logs.len(), event = "identifier_extraction_failed");
        None
    }
}
