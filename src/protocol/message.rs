//! CCTP v2 message header layout
//!
//! | field                     | bytes   |
//! |---------------------------|---------|
//! | version                   | 0..4    |
//! | sourceDomain              | 4..8    |
//! | destinationDomain         | 8..12   |
//! | nonce                     | 12..44  |
//! | sender                    | 44..76  |
//! | recipient                 | 76..108 |
//! | destinationCaller         | 108..140|
//! | minFinalityThreshold      | 140..144|
//! | finalityThresholdExecuted | 144..148|
//!
//! The nonce is zero in the bytes emitted on the source chain and filled in by
//! the attestation service, so only attested messages carry a usable nonce.

use alloy_primitives::{Bytes, FixedBytes};

use super::DomainId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u32,
    pub source_domain: DomainId,
    pub destination_domain: DomainId,
    pub nonce: FixedBytes<32>,
    pub sender: FixedBytes<32>,
    pub recipient: FixedBytes<32>,
    pub destination_caller: FixedBytes<32>,
    pub min_finality_threshold: u32,
    pub finality_threshold_executed: u32,
}

impl MessageHeader {
    pub const SIZE: usize = 148;

    pub fn encode(&self) -> Bytes {
        let mut bytes = Vec::with_capacity(Self::SIZE);

        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&self.source_domain.as_u32().to_be_bytes());
        bytes.extend_from_slice(&self.destination_domain.as_u32().to_be_bytes());
        bytes.extend_from_slice(self.nonce.as_slice());
        bytes.extend_from_slice(self.sender.as_slice());
        bytes.extend_from_slice(self.recipient.as_slice());
        bytes.extend_from_slice(self.destination_caller.as_slice());
        bytes.extend_from_slice(&self.min_finality_threshold.to_be_bytes());
        bytes.extend_from_slice(&self.finality_threshold_executed.to_be_bytes());

        Bytes::from(bytes)
    }

    /// Returns `None` if `bytes` is shorter than [`MessageHeader::SIZE`] or a
    /// domain is unknown.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }

        let word = |start: usize| {
            u32::from_be_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ])
        };

        Some(Self {
            version: word(0),
            source_domain: DomainId::from_u32(word(4))?,
            destination_domain: DomainId::from_u32(word(8))?,
            nonce: FixedBytes::from_slice(&bytes[12..44]),
            sender: FixedBytes::from_slice(&bytes[44..76]),
            recipient: FixedBytes::from_slice(&bytes[76..108]),
            destination_caller: FixedBytes::from_slice(&bytes[108..140]),
            min_finality_threshold: word(140),
            finality_threshold_executed: word(144),
        })
    }

    /// The nonce, if the message has been assigned one.
    pub fn assigned_nonce(&self) -> Option<FixedBytes<32>> {
        (!self.nonce.is_zero()).then_some(self.nonce)
    }
}
