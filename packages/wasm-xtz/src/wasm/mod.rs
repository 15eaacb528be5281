//! WASM bindings for wasm-xtz
//!
//! This module contains thin wrappers with #[wasm_bindgen] that delegate
//! to the core Rust implementations.

pub mod tezos;

pub use tezos::TezosNamespace;
