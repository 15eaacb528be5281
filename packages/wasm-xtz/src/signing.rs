//! Signing helpers around forged operations
//!
//! The signature itself is produced by an external signer; these helpers
//! compute what it signs and assemble the result for broadcast.

use crate::address::{self, PrefixTag};
use crate::error::WasmXtzError;
use crate::operation::unforge_bytes;
use crate::types::WrappedOperation;
use blake2::{digest::consts::U32, Blake2b, Digest};

/// Watermark for generic (manager) operations
pub const GENERIC_OPERATION_WATERMARK: u8 = 0x03;

pub const SIGNATURE_LEN: usize = 64;

/// Blake2b-256 of `0x03 || forged`, the value handed to the signer
pub fn signing_digest(forged: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update([GENERIC_OPERATION_WATERMARK]);
    hasher.update(forged);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Append a 64-byte signature to forged bytes
///
/// The forged bytes are unforged first so that a signature is never attached
/// to something that is not a valid operation.
pub fn attach_signature_bytes(forged: &[u8], signature: &[u8]) -> Result<Vec<u8>, WasmXtzError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(WasmXtzError::InvalidInput(format!(
            "Signature must be {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }
    unforge_bytes(forged)?;

    let mut signed = Vec::with_capacity(forged.len() + SIGNATURE_LEN);
    signed.extend_from_slice(forged);
    signed.extend_from_slice(signature);
    Ok(signed)
}

/// Append an `edsig...` signature to forged hex
pub fn attach_signature(forged_hex: &str, signature: &str) -> Result<String, WasmXtzError> {
    let forged = decode_hex(forged_hex)?;
    let signature = address::decode(signature, PrefixTag::Edsig)?;
    attach_signature_bytes(&forged, &signature).map(hex::encode)
}

/// Split signed hex into forged hex and its `edsig...` signature
pub fn split_signed(signed_hex: &str) -> Result<(String, String), WasmXtzError> {
    let signed = decode_hex(signed_hex)?;
    let (_, signature) = unforge_signed(&signed)?;
    let forged = &signed[..signed.len() - SIGNATURE_LEN];
    Ok((hex::encode(forged), signature))
}

/// Split signed bytes into the unforged operation and its `edsig...` signature
pub fn unforge_signed(signed: &[u8]) -> Result<(WrappedOperation, String), WasmXtzError> {
    if signed.len() <= SIGNATURE_LEN {
        return Err(WasmXtzError::Truncated {
            field: "signed operation",
            needed: SIGNATURE_LEN + 1,
            available: signed.len(),
        });
    }
    let (forged, signature) = signed.split_at(signed.len() - SIGNATURE_LEN);
    let operation = unforge_bytes(forged)?;
    Ok((operation, address::encode(PrefixTag::Edsig, signature)?))
}

/// Operation hash (`o...`) of signed bytes, as reported by the node after injection
pub fn operation_hash(signed: &[u8]) -> Result<String, WasmXtzError> {
    let digest = Blake2b::<U32>::digest(signed);
    address::encode(PrefixTag::OperationHash, &digest)
}

pub(crate) fn decode_hex(hex_str: &str) -> Result<Vec<u8>, WasmXtzError> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    Ok(hex::decode(hex_str)?)
}
