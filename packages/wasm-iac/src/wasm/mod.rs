//! WASM bindings for wasm-iac
//!
//! This module contains thin wrappers with #[wasm_bindgen] that delegate
//! to the core Rust implementations.

pub mod codec;
pub mod frame;

// Re-export WASM types
pub use codec::WasmIacCodec;
pub use frame::{FrameNamespace, WasmFrameAssembler};
