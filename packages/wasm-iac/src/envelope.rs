//! Versioned, protocol-tagged envelope
//!
//! Text form: `base58check(rlp([version, type, protocol, payloadTree]))`.
//! The version is checked before anything else is read, so a message from an
//! incompatible serializer never has its payload interpreted.

use crate::error::WasmIacError;
use crate::payload::{MessageType, Payload};
use crate::registry::ProtocolRegistry;
use crate::rlp::{self, RlpItem};
use serde::{Deserialize, Serialize};

pub const SERIALIZER_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default = "default_version")]
    pub version: u64,
    /// Wire identifier resolved through the registry (e.g. `"xtz"`)
    pub protocol: String,
    pub payload: Payload,
}

fn default_version() -> u64 {
    SERIALIZER_VERSION
}

impl Envelope {
    pub fn new(protocol: &str, payload: Payload) -> Self {
        Self {
            version: SERIALIZER_VERSION,
            protocol: protocol.to_string(),
            payload,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}

pub fn serialize_envelope(
    registry: &ProtocolRegistry,
    envelope: &Envelope,
) -> Result<String, WasmIacError> {
    check_version(envelope.version)?;
    let descriptor = registry.resolve(&envelope.protocol)?;
    let tree = descriptor.serializer.serialize(&envelope.payload)?;

    let message = RlpItem::List(vec![
        RlpItem::uint(envelope.version),
        RlpItem::uint(envelope.message_type() as u64),
        RlpItem::string(&envelope.protocol),
        tree,
    ]);
    Ok(bs58::encode(rlp::encode(&message))
        .with_check()
        .into_string())
}

pub fn deserialize_envelope(
    registry: &ProtocolRegistry,
    text: &str,
) -> Result<Envelope, WasmIacError> {
    let bytes = bs58::decode(text.trim()).with_check(None).into_vec()?;
    let message = rlp::decode(&bytes)?;
    let items = message.as_list("envelope")?;

    let version = items
        .first()
        .map(read_version)
        .ok_or_else(|| WasmIacError::InvalidPayload("Envelope is empty".to_string()))?;
    check_version(version)?;

    let [_, message_type, protocol, tree] = items else {
        return Err(WasmIacError::InvalidPayload(format!(
            "Envelope must have 4 elements, got {}",
            items.len()
        )));
    };
    let message_type = message_type.as_u64("message type")?;
    let message_type =
        MessageType::from_u64(message_type).ok_or(WasmIacError::TypeNotSupported(message_type))?;
    let protocol = protocol.as_string("protocol")?;
    let descriptor = registry.resolve(&protocol)?;
    let payload = descriptor.serializer.deserialize(message_type, tree)?;

    Ok(Envelope {
        version,
        protocol,
        payload,
    })
}

/// Big-endian value of the version field, read without canonical checks
///
/// A malformed version is a version mismatch, never a payload error.
fn read_version(item: &RlpItem) -> u64 {
    match item {
        RlpItem::Bytes(bytes) => bytes.iter().fold(0u64, |acc, b| {
            acc.saturating_mul(256).saturating_add(u64::from(*b))
        }),
        RlpItem::List(_) => 0,
    }
}

fn check_version(version: u64) -> Result<(), WasmIacError> {
    if version != SERIALIZER_VERSION {
        return Err(WasmIacError::VersionMismatch {
            expected: SERIALIZER_VERSION,
            found: version,
        });
    }
    Ok(())
}
