//! WASM bindings for envelope serialization
//!
//! WasmIacCodec owns a protocol registry built with the default protocols.

use crate::envelope::{deserialize_envelope, serialize_envelope, Envelope};
use crate::registry::ProtocolRegistry;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Envelope codec bound to a protocol registry
#[wasm_bindgen]
pub struct WasmIacCodec {
    registry: ProtocolRegistry,
}

#[wasm_bindgen]
impl WasmIacCodec {
    /// Create a codec for the default protocols (xtz, xtz-kt, eth, eth-erc20-ae)
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmIacCodec {
        WasmIacCodec {
            registry: ProtocolRegistry::with_defaults(),
        }
    }

    /// Serialize an envelope object (`{ protocol, payload: { type, ... } }`) to text
    #[wasm_bindgen]
    pub fn serialize(&self, envelope: JsValue) -> Result<String, JsValue> {
        let envelope: Envelope = serde_wasm_bindgen::from_value(envelope)
            .map_err(|e| JsValue::from_str(&format!("Invalid envelope: {}", e)))?;
        Ok(serialize_envelope(&self.registry, &envelope)?)
    }

    /// Parse envelope text into an envelope object
    #[wasm_bindgen]
    pub fn deserialize(&self, text: &str) -> Result<JsValue, JsValue> {
        let envelope = deserialize_envelope(&self.registry, text)?;
        to_js_value(&envelope)
    }

    /// Registered protocols, sub-protocols included
    #[wasm_bindgen]
    pub fn protocols(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.registry.protocols())
    }
}

impl Default for WasmIacCodec {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
