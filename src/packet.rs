use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TransferError;

/// Descriptor for the payload accompanying a packet: the byte count the
/// separate payload connection is expected to carry. A size of 0 denotes
/// "no payload" or "empty payload"; downstream callers distinguish the two
/// by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadInfo {
    pub size: u64,
}

/// Immutable typed envelope for one control message.
///
/// Carries a type tag, a JSON body stored verbatim (field semantics belong
/// to the per-message-type collaborators), and an optional payload
/// descriptor. Wire framing is an external codec's job; this layer only
/// guarantees the in-memory shape and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    body: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<PayloadInfo>,
}

impl Packet {
    /// Construct a packet. Fails when `kind` is empty or whitespace-only.
    /// The body is not schema-checked here.
    pub fn new(kind: impl Into<String>, body: Map<String, Value>) -> Result<Self, TransferError> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(TransferError::Validation(
                "packet type must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            kind,
            body,
            payload: None,
        })
    }

    /// Return a packet annotated with the byte count of the accompanying
    /// payload. Consumes the original; packets are never mutated in place.
    pub fn with_payload(self, size: u64) -> Self {
        Self {
            payload: Some(PayloadInfo { size }),
            ..self
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn payload(&self) -> Option<&PayloadInfo> {
        self.payload.as_ref()
    }

    pub fn expected_payload_size(&self) -> Option<u64> {
        self.payload.map(|p| p.size)
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("content".to_string(), json!("hello from the other device"));
        body.insert("isCut".to_string(), json!(false));
        body
    }

    #[test]
    fn test_new_keeps_kind_and_body_verbatim() {
        let body = sample_body();
        let packet = Packet::new("clipboard", body.clone()).unwrap();

        assert_eq!(packet.kind(), "clipboard");
        assert_eq!(packet.body(), &body);
        assert!(packet.payload().is_none());
        assert!(!packet.id().is_empty());
    }

    #[test]
    fn test_empty_kind_is_rejected() {
        let result = Packet::new("", Map::new());
        assert!(matches!(result, Err(TransferError::Validation(_))));
    }

    #[test]
    fn test_whitespace_kind_is_rejected() {
        let result = Packet::new("   ", Map::new());
        assert!(matches!(result, Err(TransferError::Validation(_))));
    }

    #[test]
    fn test_with_payload_annotates_size() {
        let packet = Packet::new("share.request", sample_body())
            .unwrap()
            .with_payload(1_048_576);

        assert!(packet.has_payload());
        assert_eq!(packet.expected_payload_size(), Some(1_048_576));
    }

    #[test]
    fn test_zero_size_payload_is_legal() {
        let packet = Packet::new("share.request", Map::new())
            .unwrap()
            .with_payload(0);

        assert!(packet.has_payload());
        assert_eq!(packet.expected_payload_size(), Some(0));
    }

    #[test]
    fn test_distinct_packets_get_distinct_ids() {
        let a = Packet::new("ping", Map::new()).unwrap();
        let b = Packet::new("ping", Map::new()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_serde_shape_uses_type_tag_and_omits_empty_payload() {
        let packet = Packet::new("battery", sample_body()).unwrap();
        let value = serde_json::to_value(&packet).unwrap();

        assert_eq!(value["type"], "battery");
        assert_eq!(value["body"]["isCut"], json!(false));
        assert!(value.get("payload").is_none());

        let annotated = Packet::new("battery", Map::new()).unwrap().with_payload(42);
        let value = serde_json::to_value(&annotated).unwrap();
        assert_eq!(value["payload"]["size"], json!(42));
    }
}
