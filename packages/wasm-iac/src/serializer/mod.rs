//! Per-protocol payload serializers
//!
//! A serializer turns a typed [`Payload`] into the RLP tree stored in the
//! envelope and back. Only the chain-specific transaction bodies differ
//! between protocols; the surrounding payload shapes are shared and handled
//! by the trait's provided methods.

mod ethereum;
mod tezos;

pub use ethereum::{EthereumSerializer, AE_TOKEN_CONTRACT};
pub use tezos::{TezosAccountKind, TezosSerializer};

use crate::error::WasmIacError;
use crate::payload::{
    MessageType, Payload, SignedTransaction, TransactionDisplay, UnsignedBody,
    UnsignedTransaction, WalletSync,
};
use crate::rlp::RlpItem;
use std::fmt;

pub trait PayloadSerializer: Send + Sync + fmt::Debug {
    /// Encode the chain-specific part of an unsigned transaction
    fn serialize_unsigned_body(&self, body: &UnsignedBody) -> Result<RlpItem, WasmIacError>;

    fn deserialize_unsigned_body(&self, tree: &RlpItem) -> Result<UnsignedBody, WasmIacError>;

    /// Reject signed bytes this protocol could not broadcast
    fn validate_signed(&self, _signed: &[u8]) -> Result<(), WasmIacError> {
        Ok(())
    }

    fn serialize(&self, payload: &Payload) -> Result<RlpItem, WasmIacError> {
        match payload {
            Payload::UnsignedTransaction(unsigned) => Ok(RlpItem::List(vec![
                self.serialize_unsigned_body(&unsigned.transaction)?,
                RlpItem::string(&unsigned.public_key),
                RlpItem::optional(unsigned.callback.as_deref().map(RlpItem::string)),
            ])),
            Payload::SignedTransaction(signed) => {
                self.validate_signed(&signed.transaction)?;
                Ok(signed_to_tree(signed))
            }
            Payload::WalletSync(sync) => Ok(wallet_sync_to_tree(sync)),
        }
    }

    fn deserialize(
        &self,
        message_type: MessageType,
        tree: &RlpItem,
    ) -> Result<Payload, WasmIacError> {
        match message_type {
            MessageType::UnsignedTransaction => {
                let items = tree.as_fixed_list("unsigned transaction", 3)?;
                let callback = items[2]
                    .as_optional("callback")?
                    .map(|item| item.as_string("callback"))
                    .transpose()?;
                Ok(Payload::UnsignedTransaction(UnsignedTransaction {
                    transaction: self.deserialize_unsigned_body(&items[0])?,
                    public_key: items[1].as_string("public key")?,
                    callback,
                }))
            }
            MessageType::SignedTransaction => {
                let signed = signed_from_tree(tree)?;
                self.validate_signed(&signed.transaction)?;
                Ok(Payload::SignedTransaction(signed))
            }
            MessageType::WalletSync => wallet_sync_from_tree(tree).map(Payload::WalletSync),
        }
    }
}

fn signed_to_tree(signed: &SignedTransaction) -> RlpItem {
    let display = signed.display.as_ref().map(|display| {
        RlpItem::List(vec![
            string_list(&display.from),
            string_list(&display.to),
            RlpItem::biguint(&display.amount),
            RlpItem::biguint(&display.fee),
        ])
    });
    RlpItem::List(vec![
        RlpItem::bytes(signed.transaction.clone()),
        RlpItem::string(&signed.account_identifier),
        RlpItem::optional(display),
    ])
}

fn signed_from_tree(tree: &RlpItem) -> Result<SignedTransaction, WasmIacError> {
    let items = tree.as_fixed_list("signed transaction", 3)?;
    let display = match items[2].as_optional("display")? {
        Some(display) => {
            let fields = display.as_fixed_list("display", 4)?;
            Some(TransactionDisplay {
                from: strings_from_list(&fields[0], "display from")?,
                to: strings_from_list(&fields[1], "display to")?,
                amount: fields[2].as_biguint("display amount")?,
                fee: fields[3].as_biguint("display fee")?,
            })
        }
        None => None,
    };
    Ok(SignedTransaction {
        transaction: items[0].as_bytes("signed transaction bytes")?.to_vec(),
        account_identifier: items[1].as_string("account identifier")?,
        display,
    })
}

fn wallet_sync_to_tree(sync: &WalletSync) -> RlpItem {
    RlpItem::List(vec![
        RlpItem::string(&sync.public_key),
        RlpItem::string(&sync.derivation_path),
        RlpItem::uint(u64::from(sync.is_extended_public_key)),
    ])
}

fn wallet_sync_from_tree(tree: &RlpItem) -> Result<WalletSync, WasmIacError> {
    let items = tree.as_fixed_list("wallet sync", 3)?;
    Ok(WalletSync {
        public_key: items[0].as_string("public key")?,
        derivation_path: items[1].as_string("derivation path")?,
        is_extended_public_key: items[2].as_bool("extended key flag")?,
    })
}

fn string_list(values: &[String]) -> RlpItem {
    RlpItem::List(values.iter().map(|value| RlpItem::string(value)).collect())
}

fn strings_from_list(tree: &RlpItem, field: &str) -> Result<Vec<String>, WasmIacError> {
    tree.as_list(field)?
        .iter()
        .map(|item| item.as_string(field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    /// Serializer with an opaque single-byte-string body
    #[derive(Debug)]
    struct OpaqueSerializer;

    impl PayloadSerializer for OpaqueSerializer {
        fn serialize_unsigned_body(&self, body: &UnsignedBody) -> Result<RlpItem, WasmIacError> {
            match body {
                UnsignedBody::Tezos(tezos) => Ok(RlpItem::bytes(tezos.binary.clone())),
                UnsignedBody::Ethereum(_) => {
                    Err(WasmIacError::InvalidPayload("unexpected body".to_string()))
                }
            }
        }

        fn deserialize_unsigned_body(&self, tree: &RlpItem) -> Result<UnsignedBody, WasmIacError> {
            Ok(UnsignedBody::Tezos(crate::payload::TezosUnsigned {
                binary: tree.as_bytes("body")?.to_vec(),
            }))
        }
    }

    fn roundtrip(payload: Payload) {
        let tree = OpaqueSerializer.serialize(&payload).unwrap();
        let decoded = OpaqueSerializer
            .deserialize(payload.message_type(), &tree)
            .unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_signed_with_and_without_display() {
        let mut signed = SignedTransaction {
            transaction: vec![1, 2, 3],
            account_identifier: "edpkabc".to_string(),
            display: None,
        };
        roundtrip(Payload::SignedTransaction(signed.clone()));

        signed.display = Some(TransactionDisplay {
            from: vec!["tz1a".to_string()],
            to: vec!["tz1b".to_string(), "tz1c".to_string()],
            amount: BigUint::from(100_000_000u64),
            fee: BigUint::default(),
        });
        roundtrip(Payload::SignedTransaction(signed));
    }

    #[test]
    fn test_callback_none_and_empty_are_distinct() {
        let mut unsigned = UnsignedTransaction {
            transaction: UnsignedBody::Tezos(crate::payload::TezosUnsigned { binary: vec![9] }),
            public_key: "pk".to_string(),
            callback: None,
        };
        let none_tree = OpaqueSerializer
            .serialize(&Payload::UnsignedTransaction(unsigned.clone()))
            .unwrap();
        unsigned.callback = Some(String::new());
        let empty_tree = OpaqueSerializer
            .serialize(&Payload::UnsignedTransaction(unsigned.clone()))
            .unwrap();
        assert_ne!(none_tree, empty_tree);
        roundtrip(Payload::UnsignedTransaction(unsigned));
    }

    #[test]
    fn test_wallet_sync() {
        roundtrip(Payload::WalletSync(WalletSync {
            public_key: "xpub6C".to_string(),
            derivation_path: "m/44'/1729'/0'/0'".to_string(),
            is_extended_public_key: true,
        }));
    }

    #[test]
    fn test_shape_errors() {
        let tree = RlpItem::List(vec![RlpItem::string("pk")]);
        let err = OpaqueSerializer
            .deserialize(MessageType::WalletSync, &tree)
            .unwrap_err();
        assert!(matches!(err, WasmIacError::InvalidPayload(_)));

        let tree = RlpItem::List(vec![
            RlpItem::bytes(vec![1]),
            RlpItem::string("id"),
            RlpItem::List(vec![RlpItem::List(vec![])]),
        ]);
        assert!(OpaqueSerializer
            .deserialize(MessageType::SignedTransaction, &tree)
            .is_err());
    }
}
