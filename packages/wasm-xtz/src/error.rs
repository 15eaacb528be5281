//! Error types for wasm-xtz

use thiserror::Error;
use wasm_bindgen::prelude::*;

/// Main error type for wasm-xtz operations
///
/// Every decode failure is terminal: a corrupt or truncated input is never
/// coerced into a different, still-valid operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WasmXtzError {
    /// Zarith integer without a terminating byte, or non-canonical
    #[error("Malformed varint: {0}")]
    MalformedVarint(String),
    /// Base58check text that does not decode to the requested prefix/length
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),
    /// Branch that is not a 32-byte block hash
    #[error("Invalid branch: {0}")]
    InvalidBranch(String),
    /// Operation kind tag this codec does not know
    #[error("Unsupported operation kind: 0x{0:02x}")]
    UnsupportedOperationKind(u8),
    /// Buffer ended inside a fixed-width field
    #[error("Truncated {field}: needed {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<hex::FromHexError> for WasmXtzError {
    fn from(err: hex::FromHexError) -> Self {
        WasmXtzError::InvalidInput(format!("Invalid hex: {}", err))
    }
}

impl From<bs58::decode::Error> for WasmXtzError {
    fn from(err: bs58::decode::Error) -> Self {
        WasmXtzError::InvalidAddressFormat(format!("Base58 decode error: {}", err))
    }
}

// REQUIRED: Converts to JS Error with stack trace
impl From<WasmXtzError> for JsValue {
    fn from(err: WasmXtzError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
