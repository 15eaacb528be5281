//! Prefixed base58check encoding for Tezos values
//!
//! Addresses, keys, signatures and hashes share one scheme: a fixed magic
//! prefix is prepended to a fixed-length payload and the result is
//! base58check encoded (double SHA-256 checksum). The magic bytes are chosen
//! so that the text form starts with a recognizable prefix (`tz1`, `KT1`,
//! `edpk`, ...).

use crate::error::WasmXtzError;
use blake2::{digest::consts::U20, Blake2b, Digest};
use serde::{Deserialize, Serialize};

/// Kind of prefixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrefixTag {
    /// Ed25519 public key hash (implicit account)
    Tz1,
    /// Secp256k1 public key hash (implicit account)
    Tz2,
    /// P-256 public key hash (implicit account)
    Tz3,
    /// Originated contract
    Kt1,
    /// Ed25519 public key
    Edpk,
    /// Ed25519 signature
    Edsig,
    /// Block hash, used as operation branch
    Branch,
    /// Operation hash
    OperationHash,
}

impl PrefixTag {
    pub const ALL: [PrefixTag; 8] = [
        PrefixTag::Tz1,
        PrefixTag::Tz2,
        PrefixTag::Tz3,
        PrefixTag::Kt1,
        PrefixTag::Edpk,
        PrefixTag::Edsig,
        PrefixTag::Branch,
        PrefixTag::OperationHash,
    ];

    /// Magic bytes prepended before base58check encoding
    pub fn magic(self) -> &'static [u8] {
        match self {
            PrefixTag::Tz1 => &[6, 161, 159],
            PrefixTag::Tz2 => &[6, 161, 161],
            PrefixTag::Tz3 => &[6, 161, 164],
            PrefixTag::Kt1 => &[2, 90, 121],
            PrefixTag::Edpk => &[13, 15, 37, 217],
            PrefixTag::Edsig => &[9, 245, 205, 134, 18],
            PrefixTag::Branch => &[1, 52],
            PrefixTag::OperationHash => &[5, 116],
        }
    }

    /// Payload length in bytes (without magic)
    pub fn payload_len(self) -> usize {
        match self {
            PrefixTag::Tz1 | PrefixTag::Tz2 | PrefixTag::Tz3 | PrefixTag::Kt1 => 20,
            PrefixTag::Edpk | PrefixTag::Branch | PrefixTag::OperationHash => 32,
            PrefixTag::Edsig => 64,
        }
    }

    /// Leading characters of the text form
    pub fn text_prefix(self) -> &'static str {
        match self {
            PrefixTag::Tz1 => "tz1",
            PrefixTag::Tz2 => "tz2",
            PrefixTag::Tz3 => "tz3",
            PrefixTag::Kt1 => "KT1",
            PrefixTag::Edpk => "edpk",
            PrefixTag::Edsig => "edsig",
            PrefixTag::Branch => "B",
            PrefixTag::OperationHash => "o",
        }
    }

    /// Look up a tag by its text prefix (e.g. "tz1", "KT1", "edsig")
    pub fn from_text_prefix(prefix: &str) -> Option<PrefixTag> {
        PrefixTag::ALL
            .into_iter()
            .find(|tag| tag.text_prefix() == prefix)
    }

    /// Whether the tag denotes an implicit (key-controlled) account
    pub fn is_implicit_account(self) -> bool {
        matches!(self, PrefixTag::Tz1 | PrefixTag::Tz2 | PrefixTag::Tz3)
    }
}

/// Encode `payload` under `tag`
pub fn encode(tag: PrefixTag, payload: &[u8]) -> Result<String, WasmXtzError> {
    if payload.len() != tag.payload_len() {
        return Err(WasmXtzError::InvalidAddressFormat(format!(
            "{} payload must be {} bytes, got {}",
            tag.text_prefix(),
            tag.payload_len(),
            payload.len()
        )));
    }

    let mut data = Vec::with_capacity(tag.magic().len() + payload.len());
    data.extend_from_slice(tag.magic());
    data.extend_from_slice(payload);
    Ok(bs58::encode(data).with_check().into_string())
}

/// Decode `text`, requiring it to carry `expected`'s prefix
pub fn decode(text: &str, expected: PrefixTag) -> Result<Vec<u8>, WasmXtzError> {
    let data = bs58::decode(text).with_check(None).into_vec()?;
    strip_magic(&data, expected)
        .map(|payload| payload.to_vec())
        .ok_or_else(|| {
            WasmXtzError::InvalidAddressFormat(format!(
                "{} is not a valid {} value",
                text,
                expected.text_prefix()
            ))
        })
}

/// Decode into a fixed-size array
pub fn decode_array<const N: usize>(
    text: &str,
    expected: PrefixTag,
) -> Result<[u8; N], WasmXtzError> {
    let payload = decode(text, expected)?;
    payload.try_into().map_err(|_| {
        WasmXtzError::InvalidAddressFormat(format!(
            "{} payload does not fit {} bytes",
            expected.text_prefix(),
            N
        ))
    })
}

/// Identify which table entry `text` belongs to
pub fn detect(text: &str) -> Result<(PrefixTag, Vec<u8>), WasmXtzError> {
    let data = bs58::decode(text).with_check(None).into_vec()?;
    PrefixTag::ALL
        .into_iter()
        .find_map(|tag| strip_magic(&data, tag).map(|payload| (tag, payload.to_vec())))
        .ok_or_else(|| WasmXtzError::InvalidAddressFormat(format!("Unknown prefix: {}", text)))
}

/// Validate a value, optionally requiring a specific tag
pub fn validate_address(text: &str, expected: Option<PrefixTag>) -> bool {
    match detect(text) {
        Ok((tag, _)) => expected.map_or(true, |expected| tag == expected),
        Err(_) => false,
    }
}

/// Derive the tz1 address of an ed25519 public key (`edpk...`)
pub fn public_key_hash(public_key: &str) -> Result<String, WasmXtzError> {
    let key = decode(public_key, PrefixTag::Edpk)?;
    let mut hasher = Blake2b::<U20>::new();
    hasher.update(&key);
    encode(PrefixTag::Tz1, &hasher.finalize())
}

fn strip_magic(data: &[u8], tag: PrefixTag) -> Option<&[u8]> {
    data.strip_prefix(tag.magic())
        .filter(|payload| payload.len() == tag.payload_len())
}
