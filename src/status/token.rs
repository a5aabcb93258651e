//! # Operation Tokens
//!
//! Persisted continuation for a remote mutation that has been submitted but not
//! yet confirmed. A token is keyed by `(kind, resource_name)` and carries the
//! adapter's opaque polling payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of remote mutation a token tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum OperationType {
    #[serde(rename = "PUT")]
    CreateOrUpdate,
    #[serde(rename = "DELETE")]
    Delete,
}

impl OperationType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::CreateOrUpdate => "PUT",
            OperationType::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resumable handle for an in-flight long-running operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationToken {
    /// Service (resource kind) that submitted the operation
    pub kind: String,
    pub resource_name: String,
    #[serde(default)]
    pub resource_group: String,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    /// Adapter-specific polling state, base64 encoded on the wire
    #[serde(serialize_with = "encode_payload", deserialize_with = "decode_payload")]
    #[schemars(with = "String")]
    pub payload: Vec<u8>,
    #[schemars(with = "String")]
    pub created_at: DateTime<Utc>,
}

impl OperationToken {
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        resource_name: impl Into<String>,
        resource_group: impl Into<String>,
        operation_type: OperationType,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            kind: kind.into(),
            resource_name: resource_name.into(),
            resource_group: resource_group.into(),
            operation_type,
            payload,
            created_at: Utc::now(),
        }
    }

    /// True if this token belongs to the given `(kind, resource_name)` key
    #[must_use]
    pub fn matches(&self, kind: &str, resource_name: &str) -> bool {
        self.kind == kind && self.resource_name == resource_name
    }
}

fn encode_payload<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(payload))
}

fn decode_payload<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}
