//! Deep links between the online wallet and the offline vault
//!
//! `airgap-wallet://?d=<parts>` and `airgap-vault://?d=<parts>`, where
//! `<parts>` is one envelope text or its frames joined by `,`. Base58 text
//! contains no URL-reserved characters, so no escaping is applied.

use crate::error::WasmIacError;
use serde::{Deserialize, Serialize};

const DATA_PARAM: &str = "d";
const PART_SEPARATOR: &str = ",";

/// Which app a deep link opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeepLinkTarget {
    Wallet,
    Vault,
}

impl DeepLinkTarget {
    pub fn scheme(self) -> &'static str {
        match self {
            DeepLinkTarget::Wallet => "airgap-wallet",
            DeepLinkTarget::Vault => "airgap-vault",
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        [DeepLinkTarget::Wallet, DeepLinkTarget::Vault]
            .into_iter()
            .find(|target| target.scheme() == scheme)
    }
}

pub fn to_deep_link<S: AsRef<str>>(
    target: DeepLinkTarget,
    parts: &[S],
) -> Result<String, WasmIacError> {
    if parts.is_empty() {
        return Err(WasmIacError::InvalidInput("Deep link needs data".to_string()));
    }
    let mut data = Vec::with_capacity(parts.len());
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(WasmIacError::InvalidInput(format!(
                "Deep link part is not base58 text: {:?}",
                part
            )));
        }
        data.push(part);
    }
    Ok(format!(
        "{}://?{}={}",
        target.scheme(),
        DATA_PARAM,
        data.join(PART_SEPARATOR)
    ))
}

/// Split a deep link into its target and data parts
pub fn parse_deep_link(url: &str) -> Result<(DeepLinkTarget, Vec<String>), WasmIacError> {
    let url = url.trim();
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| WasmIacError::InvalidInput(format!("Not a deep link: {}", url)))?;
    let target = DeepLinkTarget::from_scheme(scheme)
        .ok_or_else(|| WasmIacError::InvalidInput(format!("Unknown deep link scheme: {}", scheme)))?;

    let query = rest
        .split_once('?')
        .map(|(_, query)| query)
        .ok_or_else(|| WasmIacError::InvalidInput("Deep link has no query".to_string()))?;
    let data = query
        .split('&')
        .find_map(|pair| pair.strip_prefix(DATA_PARAM)?.strip_prefix('='))
        .ok_or_else(|| {
            WasmIacError::InvalidInput(format!("Deep link has no '{}' parameter", DATA_PARAM))
        })?;

    let parts: Vec<String> = data
        .split(PART_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if parts.is_empty() {
        return Err(WasmIacError::InvalidInput("Deep link data is empty".to_string()));
    }
    Ok((target, parts))
}
