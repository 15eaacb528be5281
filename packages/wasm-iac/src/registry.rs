//! Protocol registry
//!
//! Maps wire identifiers (`"xtz"`, `"eth-erc20-ae"`, ...) to the descriptor
//! whose serializer handles them. Sub-protocols (tokens, secondary account
//! kinds) are nested under their base chain and resolved by longest prefix.
//!
//! Registration takes `&mut self`; once built the registry is shared by
//! reference, so lookups never race with registration.

use crate::error::WasmIacError;
use crate::serializer::{
    EthereumSerializer, PayloadSerializer, TezosAccountKind, TezosSerializer, AE_TOKEN_CONTRACT,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

pub const MAINNET: &str = "mainnet";

#[derive(Debug, Clone)]
pub struct ProtocolDescriptor {
    pub identifier: String,
    pub network: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub serializer: Arc<dyn PayloadSerializer>,
    pub sub_protocols: Vec<ProtocolDescriptor>,
}

impl ProtocolDescriptor {
    pub fn new(
        identifier: &str,
        name: &str,
        symbol: &str,
        decimals: u8,
        serializer: Arc<dyn PayloadSerializer>,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            network: MAINNET.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            serializer,
            sub_protocols: Vec::new(),
        }
    }

    /// Move this descriptor and its sub-protocols to `network`
    pub fn on_network(mut self, network: &str) -> Self {
        self.network = network.to_string();
        self.sub_protocols = self
            .sub_protocols
            .into_iter()
            .map(|sub_protocol| sub_protocol.on_network(network))
            .collect();
        self
    }

    /// Attach a sub-protocol; it inherits this descriptor's network
    pub fn with_sub_protocol(mut self, sub_protocol: ProtocolDescriptor) -> Self {
        self.sub_protocols.push(sub_protocol.on_network(&self.network));
        self
    }

    pub fn info(&self) -> ProtocolInfo {
        ProtocolInfo {
            identifier: self.identifier.clone(),
            network: self.network.clone(),
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
        }
    }

    /// This descriptor followed by its sub-protocols, depth first
    fn flatten<'a>(&'a self, out: &mut Vec<&'a ProtocolDescriptor>) {
        out.push(self);
        for sub_protocol in &self.sub_protocols {
            sub_protocol.flatten(out);
        }
    }
}

/// Serializable view of a descriptor, without its serializer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolInfo {
    pub identifier: String,
    pub network: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    protocols: Vec<ProtocolDescriptor>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tezos (with KT1 accounts) and Ethereum (with the AE token) on mainnet
    pub fn with_defaults() -> Self {
        Self {
            protocols: vec![tezos(), ethereum()],
        }
    }

    /// Append a base protocol and its sub-protocols
    ///
    /// Fails without modifying the registry if any `(identifier, network)`
    /// pair in the descriptor tree is already present.
    pub fn register(&mut self, descriptor: ProtocolDescriptor) -> Result<(), WasmIacError> {
        let mut existing = self.flattened();
        let mut incoming = Vec::new();
        descriptor.flatten(&mut incoming);

        for candidate in incoming {
            let duplicate = existing.iter().any(|known| {
                known.identifier == candidate.identifier && known.network == candidate.network
            });
            if duplicate {
                return Err(WasmIacError::DuplicateProtocolRegistration {
                    identifier: candidate.identifier.clone(),
                    network: candidate.network.clone(),
                });
            }
            existing.push(candidate);
        }

        debug!(
            identifier = %descriptor.identifier,
            network = %descriptor.network,
            sub_protocols = descriptor.sub_protocols.len(),
            "registered protocol"
        );
        self.protocols.push(descriptor);
        Ok(())
    }

    /// Longest registered identifier that prefixes `identifier`
    ///
    /// Ties prefer mainnet, then the earliest registration.
    pub fn resolve(&self, identifier: &str) -> Result<&ProtocolDescriptor, WasmIacError> {
        self.best_match(identifier, None)
    }

    /// Like [`resolve`](Self::resolve), restricted to one network
    pub fn resolve_on(
        &self,
        identifier: &str,
        network: &str,
    ) -> Result<&ProtocolDescriptor, WasmIacError> {
        self.best_match(identifier, Some(network))
    }

    /// Every registered descriptor, sub-protocols included
    pub fn protocols(&self) -> Vec<ProtocolInfo> {
        self.flattened().into_iter().map(|d| d.info()).collect()
    }

    fn flattened(&self) -> Vec<&ProtocolDescriptor> {
        let mut out = Vec::new();
        for protocol in &self.protocols {
            protocol.flatten(&mut out);
        }
        out
    }

    fn best_match(
        &self,
        identifier: &str,
        network: Option<&str>,
    ) -> Result<&ProtocolDescriptor, WasmIacError> {
        let resolved = self
            .flattened()
            .into_iter()
            .enumerate()
            .filter(|(_, candidate)| identifier.starts_with(candidate.identifier.as_str()))
            .filter(|(_, candidate)| network.map_or(true, |n| candidate.network == n))
            .max_by_key(|(index, candidate)| {
                (
                    candidate.identifier.len(),
                    candidate.network == MAINNET,
                    std::cmp::Reverse(*index),
                )
            })
            .map(|(_, candidate)| candidate);

        match resolved {
            Some(descriptor) => {
                trace!(
                    identifier,
                    resolved = %descriptor.identifier,
                    network = %descriptor.network,
                    "resolved protocol"
                );
                Ok(descriptor)
            }
            None => Err(WasmIacError::ProtocolNotSupported(identifier.to_string())),
        }
    }
}

fn tezos() -> ProtocolDescriptor {
    ProtocolDescriptor::new(
        "xtz",
        "Tezos",
        "XTZ",
        6,
        Arc::new(TezosSerializer::new(TezosAccountKind::Implicit)),
    )
    .with_sub_protocol(ProtocolDescriptor::new(
        "xtz-kt",
        "Tezos KT",
        "XTZ",
        6,
        Arc::new(TezosSerializer::new(TezosAccountKind::Originated)),
    ))
}

fn ethereum() -> ProtocolDescriptor {
    ProtocolDescriptor::new(
        "eth",
        "Ethereum",
        "ETH",
        18,
        Arc::new(EthereumSerializer::new(1)),
    )
    .with_sub_protocol(ProtocolDescriptor::new(
        "eth-erc20-ae",
        "æternity Ethereum Token",
        "AE",
        18,
        Arc::new(EthereumSerializer::erc20(1, AE_TOKEN_CONTRACT)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("xtz", "xtz")]
    #[case("xtz-kt", "xtz-kt")]
    #[case("eth", "eth")]
    #[case("eth-erc20-ae", "eth-erc20-ae")]
    #[case("eth-erc20-unknown", "eth")]
    fn test_resolve_longest_prefix(#[case] identifier: &str, #[case] expected: &str) {
        let registry = ProtocolRegistry::with_defaults();
        assert_eq!(registry.resolve(identifier).unwrap().identifier, expected);
    }

    #[test]
    fn test_resolve_token_descriptor() {
        let registry = ProtocolRegistry::with_defaults();
        let token = registry.resolve("eth-erc20-ae").unwrap();
        assert_eq!(token.symbol, "AE");
        assert_eq!(token.network, MAINNET);
    }

    #[rstest]
    #[case("xyz")]
    #[case("")]
    #[case("et")]
    fn test_resolve_unknown(#[case] identifier: &str) {
        let registry = ProtocolRegistry::with_defaults();
        assert_eq!(
            registry.resolve(identifier).unwrap_err(),
            WasmIacError::ProtocolNotSupported(identifier.to_string())
        );
    }

    #[test]
    fn test_defaults_register_cleanly() {
        let mut registry = ProtocolRegistry::new();
        registry.register(tezos()).unwrap();
        registry.register(ethereum()).unwrap();
        assert_eq!(registry.protocols(), ProtocolRegistry::with_defaults().protocols());
        assert_eq!(registry.protocols().len(), 4);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ProtocolRegistry::with_defaults();
        let err = registry.register(tezos()).unwrap_err();
        assert_eq!(
            err,
            WasmIacError::DuplicateProtocolRegistration {
                identifier: "xtz".to_string(),
                network: MAINNET.to_string(),
            }
        );

        // sub-protocol clash is caught too, and nothing is appended
        let clash = ProtocolDescriptor::new(
            "eth-classic",
            "Ethereum Classic",
            "ETC",
            18,
            Arc::new(EthereumSerializer::new(61)),
        )
        .with_sub_protocol(ProtocolDescriptor::new(
            "eth-erc20-ae",
            "AE",
            "AE",
            18,
            Arc::new(EthereumSerializer::new(61)),
        ));
        assert!(registry.register(clash).is_err());
        assert!(registry.resolve("eth-classic").unwrap().identifier == "eth");
    }

    #[test]
    fn test_same_identifier_on_other_network() {
        let mut registry = ProtocolRegistry::new();
        let testnet = ProtocolDescriptor::new(
            "xtz",
            "Tezos Testnet",
            "XTZ",
            6,
            Arc::new(TezosSerializer::new(TezosAccountKind::Implicit)),
        )
        .on_network("ghostnet");
        registry.register(testnet).unwrap();
        registry.register(tezos()).unwrap();

        // mainnet wins the tie even though it was registered later
        assert_eq!(registry.resolve("xtz").unwrap().network, MAINNET);
        assert_eq!(
            registry.resolve_on("xtz", "ghostnet").unwrap().name,
            "Tezos Testnet"
        );
        assert!(registry.resolve_on("xtz-kt", "ghostnet").unwrap().identifier == "xtz");
        assert!(registry.resolve_on("xtz", "other").is_err());
    }

    #[test]
    fn test_sub_protocol_follows_network() {
        let descriptor = tezos().on_network("ghostnet");
        assert_eq!(descriptor.sub_protocols[0].network, "ghostnet");

        let mut registry = ProtocolRegistry::with_defaults();
        registry.register(descriptor).unwrap();
        assert_eq!(
            registry.resolve_on("xtz-kt", "ghostnet").unwrap().identifier,
            "xtz-kt"
        );
    }
}
