//! Typed payloads carried inside an envelope

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use wasm_xtz::types::decimal;

/// Message type discriminator written into the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u64)]
pub enum MessageType {
    UnsignedTransaction = 0,
    SignedTransaction = 1,
    WalletSync = 2,
}

impl MessageType {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(MessageType::UnsignedTransaction),
            1 => Some(MessageType::SignedTransaction),
            2 => Some(MessageType::WalletSync),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Payload {
    UnsignedTransaction(UnsignedTransaction),
    SignedTransaction(SignedTransaction),
    WalletSync(WalletSync),
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::UnsignedTransaction(_) => MessageType::UnsignedTransaction,
            Payload::SignedTransaction(_) => MessageType::SignedTransaction,
            Payload::WalletSync(_) => MessageType::WalletSync,
        }
    }
}

/// Signing request sent from the online wallet to the offline signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub transaction: UnsignedBody,
    pub public_key: String,
    /// URL the signer should open with the signed response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

/// Chain-specific unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chain", rename_all = "camelCase")]
pub enum UnsignedBody {
    Tezos(TezosUnsigned),
    Ethereum(EthereumUnsigned),
}

/// Forged operation bytes, as produced by `wasm_xtz::forge_bytes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TezosUnsigned {
    #[serde(with = "hex_bytes")]
    pub binary: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumUnsigned {
    #[serde(with = "decimal")]
    pub nonce: BigUint,
    #[serde(with = "decimal")]
    pub gas_price: BigUint,
    #[serde(with = "decimal")]
    pub gas_limit: BigUint,
    /// 20-byte recipient (the token contract for token transfers)
    #[serde(with = "hex_bytes")]
    pub to: Vec<u8>,
    #[serde(with = "decimal")]
    pub value: BigUint,
    pub chain_id: u64,
    #[serde(default, with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Signer response carrying the broadcastable transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    #[serde(with = "hex_bytes")]
    pub transaction: Vec<u8>,
    /// Identifies which wallet account signed (public key prefix or address)
    pub account_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<TransactionDisplay>,
}

/// What the signer showed the user, for sanity-checking on the online side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDisplay {
    pub from: Vec<String>,
    pub to: Vec<String>,
    #[serde(with = "decimal")]
    pub amount: BigUint,
    #[serde(with = "decimal")]
    pub fee: BigUint,
}

/// Watch-only account descriptor handed from the signer to the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSync {
    pub public_key: String,
    pub derivation_path: String,
    #[serde(default)]
    pub is_extended_public_key: bool,
}

/// Serde helpers for bytes as hex (`0x` prefix optional on input)
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let text = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(text).map_err(de::Error::custom)
    }
}
