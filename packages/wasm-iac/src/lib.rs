//! wasm-iac: WASM module for the inter-app communication (IAC) envelope
//!
//! This crate provides:
//! - Versioned, protocol-tagged envelopes for unsigned/signed transactions and wallet sync
//! - Protocol registry with sub-protocol (token, account kind) resolution
//! - Frame splitting and reassembly for QR codes and deep links
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//! - **Core layer** (`src/*.rs`): Pure Rust logic, no WASM dependencies
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`

pub mod config;
pub mod deeplink;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod payload;
pub mod registry;
pub mod rlp;
pub mod serializer;
pub mod wasm;

// Re-export main types for convenience
pub use config::TransportConfig;
pub use deeplink::{parse_deep_link, to_deep_link, DeepLinkTarget};
pub use envelope::{deserialize_envelope, serialize_envelope, Envelope, SERIALIZER_VERSION};
pub use error::WasmIacError;
pub use frame::{reassemble_frames, split_into_frames, FrameAssembler, SharedFrameAssembler};
pub use payload::{
    EthereumUnsigned, MessageType, Payload, SignedTransaction, TezosUnsigned, TransactionDisplay,
    UnsignedBody, UnsignedTransaction, WalletSync,
};
pub use registry::{ProtocolDescriptor, ProtocolInfo, ProtocolRegistry};
pub use serializer::PayloadSerializer;
