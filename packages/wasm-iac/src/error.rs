//! Error types for wasm-iac

use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_xtz::WasmXtzError;

/// Main error type for wasm-iac operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WasmIacError {
    /// Envelope written by a serializer version this build does not speak
    #[error("Unsupported serializer version: expected {expected}, found {found}")]
    VersionMismatch { expected: u64, found: u64 },
    /// No registered protocol matches the identifier
    #[error("Protocol not supported: {0}")]
    ProtocolNotSupported(String),
    /// Unknown message type discriminator
    #[error("Message type not supported: {0}")]
    TypeNotSupported(u64),
    /// Batch reassembly with parts still missing
    #[error("Incomplete message {message_id}: missing parts {missing:?}")]
    ChunkAssemblyIncomplete {
        message_id: String,
        missing: Vec<usize>,
    },
    #[error("Protocol {identifier} already registered on {network}")]
    DuplicateProtocolRegistration { identifier: String, network: String },
    /// Base58check or RLP structure is corrupt
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
    /// Structurally valid envelope whose payload tree has the wrong shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Tezos operation bytes failed to unforge
    #[error(transparent)]
    Tezos(#[from] WasmXtzError),
}

impl From<bs58::decode::Error> for WasmIacError {
    fn from(err: bs58::decode::Error) -> Self {
        WasmIacError::InvalidEncoding(format!("Base58 decode error: {}", err))
    }
}

impl From<hex::FromHexError> for WasmIacError {
    fn from(err: hex::FromHexError) -> Self {
        WasmIacError::InvalidInput(format!("Invalid hex: {}", err))
    }
}

// REQUIRED: Converts to JS Error with stack trace
impl From<WasmIacError> for JsValue {
    fn from(err: WasmIacError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
