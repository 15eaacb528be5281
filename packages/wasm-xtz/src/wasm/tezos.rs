//! WASM bindings for Tezos operations
//!
//! TezosNamespace provides static methods; operations cross the boundary as
//! Tezos RPC-shaped JSON objects with integer fields as decimal strings.

use crate::address::{self, PrefixTag};
use crate::error::WasmXtzError;
use crate::operation;
use crate::signing;
use crate::summary;
use crate::types::WrappedOperation;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Namespace for Tezos operations
#[wasm_bindgen]
pub struct TezosNamespace;

#[wasm_bindgen]
impl TezosNamespace {
    /// Forge a wrapped operation (`{ branch, contents: [...] }`) to hex
    #[wasm_bindgen]
    pub fn forge(value: JsValue) -> Result<String, JsValue> {
        let wrapped: WrappedOperation = serde_wasm_bindgen::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("Invalid operation: {}", e)))?;
        Ok(operation::forge(&wrapped)?)
    }

    /// Unforge hex (with or without 0x prefix) into a wrapped operation object
    #[wasm_bindgen]
    pub fn unforge(hex: &str) -> Result<JsValue, JsValue> {
        let wrapped = operation::unforge(hex)?;
        to_js_value(&wrapped)
    }

    /// Blake2b-256 digest of the watermarked forged bytes, to be signed
    #[wasm_bindgen(js_name = signingDigest)]
    pub fn signing_digest(forged_hex: &str) -> Result<Vec<u8>, JsValue> {
        let forged = signing::decode_hex(forged_hex)?;
        Ok(signing::signing_digest(&forged).to_vec())
    }

    /// Append an `edsig...` signature to forged hex
    #[wasm_bindgen(js_name = attachSignature)]
    pub fn attach_signature(forged_hex: &str, signature: &str) -> Result<String, JsValue> {
        Ok(signing::attach_signature(forged_hex, signature)?)
    }

    /// Operation hash (`o...`) of signed hex
    #[wasm_bindgen(js_name = operationHash)]
    pub fn operation_hash(signed_hex: &str) -> Result<String, JsValue> {
        let signed = signing::decode_hex(signed_hex)?;
        Ok(signing::operation_hash(&signed)?)
    }

    /// tz1 address of an `edpk...` public key
    #[wasm_bindgen(js_name = publicKeyHash)]
    pub fn public_key_hash(public_key: &str) -> Result<String, JsValue> {
        Ok(address::public_key_hash(public_key)?)
    }

    /// Encode raw bytes under a prefix ("tz1", "KT1", "edpk", "edsig", "B", "o", ...)
    #[wasm_bindgen(js_name = encodeAddress)]
    pub fn encode_address(prefix: &str, payload: &[u8]) -> Result<String, JsValue> {
        Ok(address::encode(parse_prefix(prefix)?, payload)?)
    }

    /// Decode a prefixed value, requiring the given prefix
    #[wasm_bindgen(js_name = decodeAddress)]
    pub fn decode_address(text: &str, prefix: &str) -> Result<Vec<u8>, JsValue> {
        Ok(address::decode(text, parse_prefix(prefix)?)?)
    }

    /// Per-operation summary (kind, from, to, amount, fee) of forged hex
    #[wasm_bindgen]
    pub fn summarize(forged_hex: &str) -> Result<JsValue, JsValue> {
        let summary = summary::summarize_hex(forged_hex)?;
        to_js_value(&summary)
    }
}

fn parse_prefix(prefix: &str) -> Result<PrefixTag, WasmXtzError> {
    PrefixTag::from_text_prefix(prefix)
        .ok_or_else(|| WasmXtzError::InvalidInput(format!("Unknown prefix: {}", prefix)))
}

/// Serialize as plain JS objects (flattened structs would otherwise become Maps)
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

// WASM tests - only run in wasm32 target
#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    const TRANSACTION_HEX: &str = "ce69c5713dac3537254e7be59759cf59c15abd530d10501ccf9028a5786314cf08000091a9d2b003f19cf5a1f38f04f1000ab482d33176d0860303f44e0080c2d72f000091a9d2b003f19cf5a1f38f04f1000ab482d3317600";

    #[wasm_bindgen_test]
    fn test_unforge_forge_roundtrip() {
        let operation = TezosNamespace::unforge(TRANSACTION_HEX).unwrap();
        assert_eq!(TezosNamespace::forge(operation).unwrap(), TRANSACTION_HEX);
    }

    #[wasm_bindgen_test]
    fn test_unknown_prefix() {
        assert!(TezosNamespace::encode_address("xyz", &[0u8; 20]).is_err());
    }
}
