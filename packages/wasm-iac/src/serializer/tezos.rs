use crate::error::WasmIacError;
use crate::payload::{TezosUnsigned, UnsignedBody};
use crate::rlp::RlpItem;
use crate::serializer::PayloadSerializer;
use wasm_xtz::address::{self, PrefixTag};
use wasm_xtz::{unforge_bytes, unforge_signed, Operation, WrappedOperation};

/// Which account type signs for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TezosAccountKind {
    /// tz1 accounts; every operation is sourced from one
    Implicit,
    /// KT1 accounts managed by a tz1 key; reveals still come from the manager
    Originated,
}

/// Tezos payloads: forged operation bytes, checked by unforging
#[derive(Debug, Clone)]
pub struct TezosSerializer {
    pub account_kind: TezosAccountKind,
}

impl TezosSerializer {
    pub fn new(account_kind: TezosAccountKind) -> Self {
        Self { account_kind }
    }

    fn check_sources(&self, operation: &WrappedOperation) -> Result<(), WasmIacError> {
        for op in &operation.contents {
            let expected = match (self.account_kind, op) {
                (TezosAccountKind::Implicit, _) | (_, Operation::Reveal(_)) => PrefixTag::Tz1,
                (TezosAccountKind::Originated, _) => PrefixTag::Kt1,
            };
            let source = &op.manager().source;
            let (tag, _) = address::detect(source)?;
            if tag != expected {
                return Err(WasmIacError::InvalidPayload(format!(
                    "{:?} operation sourced from {}, expected a {} account",
                    op.kind(),
                    source,
                    expected.text_prefix()
                )));
            }
        }
        Ok(())
    }
}

impl PayloadSerializer for TezosSerializer {
    fn serialize_unsigned_body(&self, body: &UnsignedBody) -> Result<RlpItem, WasmIacError> {
        let UnsignedBody::Tezos(tezos) = body else {
            return Err(WasmIacError::InvalidPayload(
                "Tezos protocol requires a Tezos transaction".to_string(),
            ));
        };
        self.check_sources(&unforge_bytes(&tezos.binary)?)?;
        Ok(RlpItem::List(vec![RlpItem::bytes(tezos.binary.clone())]))
    }

    fn deserialize_unsigned_body(&self, tree: &RlpItem) -> Result<UnsignedBody, WasmIacError> {
        let items = tree.as_fixed_list("Tezos transaction", 1)?;
        let binary = items[0].as_bytes("forged operation")?.to_vec();
        self.check_sources(&unforge_bytes(&binary)?)?;
        Ok(UnsignedBody::Tezos(TezosUnsigned { binary }))
    }

    fn validate_signed(&self, signed: &[u8]) -> Result<(), WasmIacError> {
        let (operation, _signature) = unforge_signed(signed)?;
        self.check_sources(&operation)
    }
}
