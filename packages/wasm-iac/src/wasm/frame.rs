//! WASM bindings for frame transport and deep links

use crate::config::TransportConfig;
use crate::deeplink::{self, DeepLinkTarget};
use crate::frame::{self, FrameAssembler};
use crate::wasm::codec::to_js_value;
use crate::WasmIacError;
use wasm_bindgen::prelude::*;

/// Namespace for stateless frame and deep link operations
#[wasm_bindgen]
pub struct FrameNamespace;

#[wasm_bindgen]
impl FrameNamespace {
    /// Split envelope text into frames (default budget: 350 characters)
    #[wasm_bindgen]
    pub fn split(text: &str, max_frame_len: Option<usize>) -> Result<JsValue, JsValue> {
        let max_frame_len =
            max_frame_len.unwrap_or_else(|| TransportConfig::default().max_frame_len);
        let frames = frame::split_into_frames(text, max_frame_len)?;
        to_js_value(&frames)
    }

    /// Reassemble a complete set of frames (any order) into envelope text
    #[wasm_bindgen]
    pub fn reassemble(frames: JsValue) -> Result<String, JsValue> {
        let frames = string_array(frames)?;
        Ok(frame::reassemble_frames(&frames)?)
    }

    /// Build a deep link; `target` is "wallet" or "vault"
    #[wasm_bindgen(js_name = toDeepLink)]
    pub fn to_deep_link(target: &str, parts: JsValue) -> Result<String, JsValue> {
        let target = parse_target(target)?;
        let parts = string_array(parts)?;
        Ok(deeplink::to_deep_link(target, &parts)?)
    }

    /// Parts of a deep link, as an array of strings
    #[wasm_bindgen(js_name = parseDeepLink)]
    pub fn parse_deep_link(url: &str) -> Result<JsValue, JsValue> {
        let (_, parts) = deeplink::parse_deep_link(url)?;
        to_js_value(&parts)
    }
}

/// Incremental frame reassembly for a scanner feeding one QR code at a time
#[wasm_bindgen]
pub struct WasmFrameAssembler {
    inner: FrameAssembler,
}

#[wasm_bindgen]
impl WasmFrameAssembler {
    /// Create an assembler; `config` is an optional `TransportConfig` object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmFrameAssembler, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            TransportConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| WasmIacError::InvalidInput(format!("Invalid config: {}", e)))?
        };
        Ok(WasmFrameAssembler {
            inner: FrameAssembler::new(config)?,
        })
    }

    /// Feed one scanned frame; returns the envelope text once complete
    ///
    /// # Arguments
    /// * `frame` - Frame or unchunked envelope text
    /// * `now_ms` - Current time in milliseconds (e.g. `Date.now()`)
    #[wasm_bindgen]
    pub fn accept(&mut self, frame: &str, now_ms: f64) -> Result<Option<String>, JsValue> {
        Ok(self.inner.accept(frame, millis(now_ms))?)
    }

    /// Drop stale partial messages; returns how many were dropped
    #[wasm_bindgen(js_name = evictStale)]
    pub fn evict_stale(&mut self, now_ms: f64) -> usize {
        self.inner.evict_stale(millis(now_ms))
    }

    #[wasm_bindgen(getter, js_name = pendingCount)]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }
}

fn parse_target(target: &str) -> Result<DeepLinkTarget, WasmIacError> {
    match target {
        "wallet" => Ok(DeepLinkTarget::Wallet),
        "vault" => Ok(DeepLinkTarget::Vault),
        other => Err(WasmIacError::InvalidInput(format!(
            "Unknown deep link target: {}",
            other
        ))),
    }
}

fn string_array(value: JsValue) -> Result<Vec<String>, WasmIacError> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| WasmIacError::InvalidInput(format!("Expected an array of strings: {}", e)))
}

/// JS timestamps are f64; negative or NaN clamp to zero
fn millis(now_ms: f64) -> u64 {
    now_ms as u64
}
