//! CCTP protocol types
//!
//! Domain identifiers, finality thresholds, the v2 message header, and the
//! wire shapes returned by the attestation service.

mod attestation;
mod domain_id;
mod finality;
mod message;

pub use attestation::{AttestationResult, AttestationStatus, IrisMessage, MessagesResponse};
pub use domain_id::{DomainId, InvalidDomainId};
pub use finality::FinalityThreshold;
pub use message::MessageHeader;
