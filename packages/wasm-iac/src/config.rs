//! Transport configuration for frame splitting and reassembly

use crate::error::WasmIacError;
use serde::{Deserialize, Serialize};

/// Smallest frame budget that still leaves room for a chunk after the header
pub const MIN_FRAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    /// Longest frame text, in characters (default: 350, one QR code)
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
    /// Partial messages without a new frame for this long are dropped (default: 5 minutes)
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
    /// Partial messages tracked at once; the oldest is dropped beyond this (default: 16)
    #[serde(default = "default_max_pending_messages")]
    pub max_pending_messages: usize,
}

fn default_max_frame_len() -> usize {
    350
}

fn default_stale_after_ms() -> u64 {
    300_000
}

fn default_max_pending_messages() -> usize {
    16
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_len: default_max_frame_len(),
            stale_after_ms: default_stale_after_ms(),
            max_pending_messages: default_max_pending_messages(),
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<(), WasmIacError> {
        if self.max_frame_len < MIN_FRAME_LEN {
            return Err(WasmIacError::InvalidInput(format!(
                "maxFrameLen must be at least {}, got {}",
                MIN_FRAME_LEN, self.max_frame_len
            )));
        }
        if self.max_pending_messages == 0 {
            return Err(WasmIacError::InvalidInput(
                "maxPendingMessages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
