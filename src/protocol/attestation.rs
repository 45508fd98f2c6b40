use alloy_primitives::{hex::FromHex, Bytes};
use serde::{Deserialize, Deserializer};

/// Response from the Iris v2 messages endpoint
///
/// `GET /v2/messages/{sourceDomain}?transactionHash={txHash}` returns every
/// message emitted by the transaction, so the payload is a list.
///
/// ```json
/// {
///   "messages": [
///     { "status": "complete", "message": "0x...", "attestation": "0x..." }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<IrisMessage>,
}

/// A single message entry in a [`MessagesResponse`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrisMessage {
    pub status: AttestationStatus,

    /// The message bytes as emitted by `MessageSent`, with the nonce filled in
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub message: Option<Bytes>,

    /// Signed attestation, `"PENDING"` until the message is attested
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub attestation: Option<Bytes>,
}

/// Iris reports the attestation field as the literal string `"PENDING"` rather
/// than null while signing is in progress. Treat it, null, and the empty string
/// as absent; anything else must be valid hex.
fn deserialize_optional_bytes_or_pending<'de, D>(deserializer: D) -> Result<Option<Bytes>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;

    match opt {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("pending") => Ok(None),
        Some(s) => {
            let bytes = Bytes::from_hex(s).map_err(serde::de::Error::custom)?;
            Ok(Some(bytes))
        }
    }
}

/// Status reported by the attestation service.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    Complete,
    Pending,
    PendingConfirmations,
    #[serde(other)]
    Unknown,
}

/// Outcome of a single poll of the attestation service.
///
/// Only a [`AttestationResult::Complete`] carries the message and signature
/// needed to mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationResult {
    Pending,
    Complete { message: Bytes, signature: Bytes },
}

impl AttestationResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

impl IrisMessage {
    /// Converts the wire entry into a poll outcome.
    ///
    /// A `complete` status without both a message and a non-empty signature
    /// is still pending from the caller's point of view.
    pub fn into_result(self) -> AttestationResult {
        match (self.status, self.message, self.attestation) {
            (AttestationStatus::Complete, Some(message), Some(signature))
                if !signature.is_empty() && !message.is_empty() =>
            {
                AttestationResult::Complete { message, signature }
            }
            _ => AttestationResult::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_response() {
        let json = r#"{
            "messages": [
                { "status": "complete", "message": "0xdeadbeef", "attestation": "0x1234abcd" }
            ]
        }"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.messages.len(), 1);
        let result = response.messages[0].clone().into_result();
        assert_eq!(
            result,
            AttestationResult::Complete {
                message: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
                signature: Bytes::from(vec![0x12, 0x34, 0xab, 0xcd]),
            }
        );
    }

    #[test]
    fn test_pending_literal_is_absent() {
        let json = r#"{
            "messages": [
                { "status": "pending_confirmations", "message": "0xdeadbeef", "attestation": "PENDING" }
            ]
        }"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();

        let message = &response.messages[0];
        assert_eq!(message.status, AttestationStatus::PendingConfirmations);
        assert!(message.attestation.is_none());
        assert_eq!(message.clone().into_result(), AttestationResult::Pending);
    }

    #[test]
    fn test_complete_without_signature_is_pending() {
        let json = r#"{"messages": [{ "status": "complete", "message": "0xaa", "attestation": "" }]}"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(
            response.messages[0].clone().into_result(),
            AttestationResult::Pending
        );
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let json = r#"{"messages": [{ "status": "failed" }]}"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.messages[0].status, AttestationStatus::Unknown);
    }

    #[test]
    fn test_missing_messages_field() {
        let response: MessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(response.messages.is_empty());
    }

    #[test]
    fn test_invalid_hex_fails() {
        let json = r#"{"messages": [{ "status": "complete", "attestation": "not_hex" }]}"#;
        assert!(serde_json::from_str::<MessagesResponse>(json).is_err());
    }
}
