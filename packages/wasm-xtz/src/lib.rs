//! wasm-xtz: WASM module for Tezos operation encoding
//!
//! This crate provides:
//! - Zarith variable-length integers
//! - Prefixed base58check values (addresses, keys, signatures, hashes)
//! - Forging and unforging of wrapped manager operations
//! - Signing digest, signature attachment and operation hashes
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//! - **Core layer** (`src/*.rs`): Pure Rust logic, no WASM dependencies
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`

pub mod address;
pub mod error;
pub mod operation;
pub mod signing;
pub mod summary;
pub mod types;
pub mod wasm;
pub mod zarith;

// Re-export main types for convenience
pub use address::{public_key_hash, validate_address, PrefixTag};
pub use error::WasmXtzError;
pub use operation::{forge, forge_bytes, unforge, unforge_bytes};
pub use signing::{
    attach_signature, operation_hash, signing_digest, split_signed, unforge_signed,
};
pub use summary::{summarize, OperationSummary};
pub use types::{
    Delegation, ManagerFields, Operation, OperationKind, Origination, Reveal, Transaction,
    WrappedOperation,
};
