//! Forging (binary encoding) and unforging of Tezos wrapped operations
//!
//! Layout of a forged operation:
//!
//! ```text
//! branch (32 bytes)
//! repeated:
//!   kind (1 byte) | source (22 bytes) | fee | counter | gas_limit | storage_limit
//!   kind-specific fields
//! ```
//!
//! Integers are Zarith encoded. Account addresses in `source` and
//! `destination` carry a contract-id discriminator:
//!
//! ```text
//! implicit: 0x00 | curve tag | 20-byte hash
//! contract: 0x01 | 20-byte hash | 0x00
//! ```
//!
//! A delegation's delegate is 21 bytes: `0x00 | hash` for tz1 and
//! `0x01 | hash` for KT1.

use crate::address::{self, PrefixTag};
use crate::error::WasmXtzError;
use crate::types::{
    Delegation, ManagerFields, Operation, OperationKind, Origination, Reveal, Transaction,
    WrappedOperation,
};
use crate::zarith;
use num_bigint::BigUint;

const BRANCH_LEN: usize = 32;
const HASH_LEN: usize = 20;
const PUBLIC_KEY_LEN: usize = 32;

const IMPLICIT_ACCOUNT: u8 = 0x00;
const ORIGINATED_ACCOUNT: u8 = 0x01;
const CONTRACT_PADDING: u8 = 0x00;

/// Curve tag of ed25519 keys and key hashes
const ED25519: u8 = 0x00;

const PRESENT: u8 = 0xff;
const ABSENT: u8 = 0x00;

/// Forge a wrapped operation to lowercase hex
pub fn forge(operation: &WrappedOperation) -> Result<String, WasmXtzError> {
    forge_bytes(operation).map(hex::encode)
}

/// Forge a wrapped operation to raw bytes
pub fn forge_bytes(operation: &WrappedOperation) -> Result<Vec<u8>, WasmXtzError> {
    if operation.contents.is_empty() {
        return Err(WasmXtzError::InvalidInput(
            "Wrapped operation has no contents".to_string(),
        ));
    }

    let branch = address::decode_array::<BRANCH_LEN>(&operation.branch, PrefixTag::Branch)
        .map_err(|e| WasmXtzError::InvalidBranch(e.to_string()))?;

    let mut out = Vec::with_capacity(BRANCH_LEN + 64 * operation.contents.len());
    out.extend_from_slice(&branch);
    for content in &operation.contents {
        forge_operation(content, &mut out)?;
    }
    Ok(out)
}

/// Unforge hex (with or without `0x` prefix)
pub fn unforge(hex_str: &str) -> Result<WrappedOperation, WasmXtzError> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str)?;
    unforge_bytes(&bytes)
}

/// Unforge raw bytes
///
/// Exact inverse of [`forge_bytes`]: every byte must be consumed by a field
/// reader, anything outside the representable set is rejected.
pub fn unforge_bytes(bytes: &[u8]) -> Result<WrappedOperation, WasmXtzError> {
    if bytes.len() < BRANCH_LEN {
        return Err(WasmXtzError::InvalidBranch(format!(
            "Expected {} branch bytes, got {}",
            BRANCH_LEN,
            bytes.len()
        )));
    }

    let branch = address::encode(PrefixTag::Branch, &bytes[..BRANCH_LEN])?;
    let mut reader = Reader::new(&bytes[BRANCH_LEN..]);
    if reader.is_empty() {
        return Err(WasmXtzError::InvalidInput(
            "Wrapped operation has no contents".to_string(),
        ));
    }

    let mut contents = Vec::new();
    while !reader.is_empty() {
        contents.push(unforge_operation(&mut reader)?);
    }

    Ok(WrappedOperation { branch, contents })
}

fn forge_operation(operation: &Operation, out: &mut Vec<u8>) -> Result<(), WasmXtzError> {
    out.push(operation.kind_tag());

    let manager = operation.manager();
    forge_contract_id(&manager.source, out)?;
    for value in [
        &manager.fee,
        &manager.counter,
        &manager.gas_limit,
        &manager.storage_limit,
    ] {
        out.extend_from_slice(&zarith::encode(value));
    }

    match operation {
        Operation::Reveal(reveal) => {
            let key = address::decode(&reveal.public_key, PrefixTag::Edpk)?;
            out.push(ED25519);
            out.extend_from_slice(&key);
        }
        Operation::Transaction(tx) => {
            out.extend_from_slice(&zarith::encode(&tx.amount));
            forge_contract_id(&tx.destination, out)?;
            // No call parameters
            out.push(ABSENT);
        }
        Operation::Origination(origination) => {
            forge_public_key_hash(&origination.manager_pubkey, out)?;
            out.extend_from_slice(&zarith::encode(&origination.balance));
            out.push(forge_flag(origination.spendable));
            out.push(forge_flag(origination.delegatable));
            // No delegate, no script
            out.push(ABSENT);
            out.push(ABSENT);
        }
        Operation::Delegation(delegation) => match &delegation.delegate {
            Some(delegate) => {
                out.push(PRESENT);
                forge_delegate(delegate, out)?;
            }
            None => out.push(ABSENT),
        },
    }

    Ok(())
}

/// Implicit accounts are restricted to ed25519 (tz1)
fn forge_contract_id(account: &str, out: &mut Vec<u8>) -> Result<(), WasmXtzError> {
    let (tag, hash) = address::detect(account)?;
    match tag {
        PrefixTag::Tz1 => {
            out.push(IMPLICIT_ACCOUNT);
            out.push(ED25519);
            out.extend_from_slice(&hash);
        }
        PrefixTag::Kt1 => {
            out.push(ORIGINATED_ACCOUNT);
            out.extend_from_slice(&hash);
            out.push(CONTRACT_PADDING);
        }
        other => {
            return Err(WasmXtzError::InvalidAddressFormat(format!(
                "{} accounts are not supported: {}",
                other.text_prefix(),
                account
            )))
        }
    }
    Ok(())
}

fn forge_public_key_hash(key_hash: &str, out: &mut Vec<u8>) -> Result<(), WasmXtzError> {
    let hash = address::decode(key_hash, PrefixTag::Tz1)?;
    out.push(ED25519);
    out.extend_from_slice(&hash);
    Ok(())
}

/// Delegates take 21 bytes: a tz1 key hash, or `0x01 | hash` for a KT1
fn forge_delegate(delegate: &str, out: &mut Vec<u8>) -> Result<(), WasmXtzError> {
    let (tag, hash) = address::detect(delegate)?;
    match tag {
        PrefixTag::Tz1 => out.push(ED25519),
        PrefixTag::Kt1 => out.push(ORIGINATED_ACCOUNT),
        other => {
            return Err(WasmXtzError::InvalidAddressFormat(format!(
                "{} delegates are not supported: {}",
                other.text_prefix(),
                delegate
            )))
        }
    }
    out.extend_from_slice(&hash);
    Ok(())
}

fn forge_flag(value: bool) -> u8 {
    if value {
        PRESENT
    } else {
        ABSENT
    }
}

fn unforge_operation(reader: &mut Reader) -> Result<Operation, WasmXtzError> {
    let tag = reader.byte("operation kind")?;
    let kind = OperationKind::from_tag(tag).ok_or(WasmXtzError::UnsupportedOperationKind(tag))?;

    let manager = ManagerFields {
        source: unforge_contract_id(reader)?,
        fee: reader.zarith()?,
        counter: reader.zarith()?,
        gas_limit: reader.zarith()?,
        storage_limit: reader.zarith()?,
    };

    let operation = match kind {
        OperationKind::Reveal => {
            let key_tag = reader.byte("public key tag")?;
            if key_tag != ED25519 {
                return Err(WasmXtzError::InvalidAddressFormat(format!(
                    "Unsupported public key tag: 0x{:02x}",
                    key_tag
                )));
            }
            let key = reader.take(PUBLIC_KEY_LEN, "public key")?;
            Operation::Reveal(Reveal {
                manager,
                public_key: address::encode(PrefixTag::Edpk, key)?,
            })
        }
        OperationKind::Transaction => {
            let amount = reader.zarith()?;
            let destination = unforge_contract_id(reader)?;
            if reader.byte("parameters flag")? != ABSENT {
                return Err(WasmXtzError::InvalidInput(
                    "Transaction parameters are not supported".to_string(),
                ));
            }
            Operation::Transaction(Transaction {
                manager,
                amount,
                destination,
            })
        }
        OperationKind::Origination => {
            let manager_pubkey = unforge_public_key_hash(reader)?;
            let balance = reader.zarith()?;
            let spendable = reader.flag("spendable")?;
            let delegatable = reader.flag("delegatable")?;
            if reader.byte("delegate flag")? != ABSENT || reader.byte("script flag")? != ABSENT {
                return Err(WasmXtzError::InvalidInput(
                    "Origination delegate and script are not supported".to_string(),
                ));
            }
            Operation::Origination(Origination {
                manager,
                balance,
                manager_pubkey,
                spendable,
                delegatable,
            })
        }
        OperationKind::Delegation => {
            let delegate = if reader.flag("delegate flag")? {
                Some(unforge_delegate(reader)?)
            } else {
                None
            };
            Operation::Delegation(Delegation { manager, delegate })
        }
    };

    Ok(operation)
}

fn unforge_contract_id(reader: &mut Reader) -> Result<String, WasmXtzError> {
    match reader.byte("contract id")? {
        IMPLICIT_ACCOUNT => unforge_public_key_hash(reader),
        ORIGINATED_ACCOUNT => {
            let hash = reader.take(HASH_LEN, "contract hash")?;
            if reader.byte("contract padding")? != CONTRACT_PADDING {
                return Err(WasmXtzError::InvalidAddressFormat(
                    "Contract id padding must be zero".to_string(),
                ));
            }
            address::encode(PrefixTag::Kt1, hash)
        }
        other => Err(WasmXtzError::InvalidAddressFormat(format!(
            "Unknown contract id discriminator: 0x{:02x}",
            other
        ))),
    }
}

fn unforge_public_key_hash(reader: &mut Reader) -> Result<String, WasmXtzError> {
    let curve = reader.byte("key hash tag")?;
    if curve != ED25519 {
        return Err(WasmXtzError::InvalidAddressFormat(format!(
            "Unsupported implicit account curve tag: 0x{:02x}",
            curve
        )));
    }
    let hash = reader.take(HASH_LEN, "public key hash")?;
    address::encode(PrefixTag::Tz1, hash)
}

fn unforge_delegate(reader: &mut Reader) -> Result<String, WasmXtzError> {
    let tag = reader.byte("delegate tag")?;
    let hash = reader.take(HASH_LEN, "delegate hash")?;
    match tag {
        ED25519 => address::encode(PrefixTag::Tz1, hash),
        ORIGINATED_ACCOUNT => address::encode(PrefixTag::Kt1, hash),
        other => Err(WasmXtzError::InvalidAddressFormat(format!(
            "Unsupported delegate tag: 0x{:02x}",
            other
        ))),
    }
}

/// Forward-only cursor over the operation contents
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], WasmXtzError> {
        let available = self.bytes.len() - self.pos;
        if len > available {
            return Err(WasmXtzError::Truncated {
                field,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn byte(&mut self, field: &'static str) -> Result<u8, WasmXtzError> {
        self.take(1, field).map(|b| b[0])
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, WasmXtzError> {
        match self.byte(field)? {
            PRESENT => Ok(true),
            ABSENT => Ok(false),
            other => Err(WasmXtzError::InvalidInput(format!(
                "Invalid {} byte: 0x{:02x}",
                field, other
            ))),
        }
    }

    fn zarith(&mut self) -> Result<BigUint, WasmXtzError> {
        let rest = &self.bytes[self.pos..];
        let end = zarith::find_varint_end(rest)?;
        let (value, _) = zarith::decode(&rest[..end])?;
        self.pos += end;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRANCH: &str = "BMHBtAaUv59LipV1czwZ5iQkxEktPJDE7A9sYXPkPeRzbBasNY8";
    const BRANCH_HEX: &str = "ce69c5713dac3537254e7be59759cf59c15abd530d10501ccf9028a5786314cf";
    const ACCOUNT: &str = "tz1YvE7Sfo92ueEPEdZceNWd5MWNeMNSt16L";
    const ACCOUNT_HASH: &str = "91a9d2b003f19cf5a1f38f04f1000ab482d33176";
    const PUBLIC_KEY: &str = "edpkuBknW28nW72KG6RoHtYW7p12T6GKc7nAbwYX5m8Wd9sDVC9yav";

    const TRANSACTION_HEX: &str = "ce69c5713dac3537254e7be59759cf59c15abd530d10501ccf9028a5786314cf08000091a9d2b003f19cf5a1f38f04f1000ab482d33176d0860303f44e0080c2d72f000091a9d2b003f19cf5a1f38f04f1000ab482d3317600";
    const ORIGINATION_BODY_HEX: &str = "09000091a9d2b003f19cf5a1f38f04f1000ab482d33176f80ac4fe37904e81020091a9d2b003f19cf5a1f38f04f1000ab482d3317600ffff0000";

    fn manager(fee: u64, counter: u64, gas_limit: u64, storage_limit: u64) -> ManagerFields {
        ManagerFields {
            source: ACCOUNT.to_string(),
            fee: BigUint::from(fee),
            counter: BigUint::from(counter),
            gas_limit: BigUint::from(gas_limit),
            storage_limit: BigUint::from(storage_limit),
        }
    }

    fn wrap(contents: Vec<Operation>) -> WrappedOperation {
        WrappedOperation {
            branch: BRANCH.to_string(),
            contents,
        }
    }

    fn kt1() -> String {
        address::encode(PrefixTag::Kt1, &hex::decode(ACCOUNT_HASH).unwrap()).unwrap()
    }

    fn transaction() -> WrappedOperation {
        wrap(vec![Operation::Transaction(Transaction {
            manager: manager(50000, 3, 10100, 0),
            amount: BigUint::from(100000000u64),
            destination: ACCOUNT.to_string(),
        })])
    }

    fn origination() -> WrappedOperation {
        wrap(vec![Operation::Origination(Origination {
            manager: manager(1400, 917316, 10000, 257),
            balance: BigUint::from(0u8),
            manager_pubkey: ACCOUNT.to_string(),
            spendable: true,
            delegatable: true,
        })])
    }

    #[test]
    fn test_forge_transaction_vector() {
        assert_eq!(forge(&transaction()).unwrap(), TRANSACTION_HEX);
    }

    #[test]
    fn test_unforge_transaction_vector() {
        assert_eq!(unforge(TRANSACTION_HEX).unwrap(), transaction());
        assert_eq!(
            unforge(&format!("0x{}", TRANSACTION_HEX)).unwrap(),
            transaction()
        );
    }

    #[test]
    fn test_origination_vector() {
        let forged = forge(&origination()).unwrap();
        assert_eq!(forged, format!("{}{}", BRANCH_HEX, ORIGINATION_BODY_HEX));
        assert_eq!(unforge(&forged).unwrap(), origination());
    }

    #[test]
    fn test_reveal_and_transaction_batch() {
        let op = wrap(vec![
            Operation::Reveal(Reveal {
                manager: manager(1269, 4, 10000, 0),
                public_key: PUBLIC_KEY.to_string(),
            }),
            Operation::Transaction(Transaction {
                manager: manager(1420, 5, 10100, 300),
                amount: BigUint::from(1u8),
                destination: kt1(),
            }),
        ]);
        let forged = forge(&op).unwrap();
        // reveal: kind, source, fee 1269, counter 4, gas 10000, storage 0, key tag
        assert!(forged.starts_with(&format!(
            "{}070000{}f50904904e0000",
            BRANCH_HEX, ACCOUNT_HASH
        )));
        // amount 1, contract destination (01 | hash | 00), no parameters
        assert!(forged.ends_with(&format!("0101{}0000", ACCOUNT_HASH)));
        assert_eq!(unforge(&forged).unwrap(), op);
    }

    #[test]
    fn test_delegation_roundtrip() {
        let set = wrap(vec![Operation::Delegation(Delegation {
            manager: manager(1257, 7, 10000, 0),
            delegate: Some(ACCOUNT.to_string()),
        })]);
        let forged = forge(&set).unwrap();
        assert!(forged.ends_with(&format!("ff00{}", ACCOUNT_HASH)));
        assert_eq!(unforge(&forged).unwrap(), set);

        let withdraw = wrap(vec![Operation::Delegation(Delegation {
            manager: manager(1257, 8, 10000, 0),
            delegate: None,
        })]);
        let forged = forge(&withdraw).unwrap();
        assert!(forged.ends_with("00"));
        assert_eq!(unforge(&forged).unwrap(), withdraw);
    }

    #[test]
    fn test_originated_delegate() {
        let op = wrap(vec![Operation::Delegation(Delegation {
            manager: manager(1257, 9, 10000, 0),
            delegate: Some(kt1()),
        })]);
        let forged = forge(&op).unwrap();
        assert!(forged.ends_with(&format!("ff01{}", ACCOUNT_HASH)));
        assert_eq!(unforge(&forged).unwrap(), op);

        let bad_tag = format!("{}02{}", &forged[..forged.len() - 42], ACCOUNT_HASH);
        assert!(matches!(
            unforge(&bad_tag),
            Err(WasmXtzError::InvalidAddressFormat(_))
        ));

        let tz2 = address::encode(PrefixTag::Tz2, &[7u8; 20]).unwrap();
        let op = wrap(vec![Operation::Delegation(Delegation {
            manager: manager(1257, 9, 10000, 0),
            delegate: Some(tz2),
        })]);
        assert!(matches!(
            forge(&op),
            Err(WasmXtzError::InvalidAddressFormat(_))
        ));
    }

    #[test]
    fn test_originated_source() {
        let mut fields = manager(1400, 2, 10000, 0);
        fields.source = kt1();
        let op = wrap(vec![Operation::Delegation(Delegation {
            manager: fields,
            delegate: Some(ACCOUNT.to_string()),
        })]);
        let forged = forge(&op).unwrap();
        assert!(forged.starts_with(&format!("{}0a01{}00", BRANCH_HEX, ACCOUNT_HASH)));
        assert_eq!(unforge(&forged).unwrap(), op);
    }

    #[test]
    fn test_unsupported_kind() {
        let hex = format!("{}6b00", BRANCH_HEX);
        assert_eq!(
            unforge(&hex).unwrap_err(),
            WasmXtzError::UnsupportedOperationKind(0x6b)
        );
    }

    #[test]
    fn test_short_branch() {
        assert!(matches!(
            unforge("ce69c571"),
            Err(WasmXtzError::InvalidBranch(_))
        ));
        let mut op = transaction();
        op.branch = ACCOUNT.to_string();
        assert!(matches!(forge(&op), Err(WasmXtzError::InvalidBranch(_))));
    }

    #[test]
    fn test_truncated_inputs_fail() {
        // Every strict prefix past the branch must fail, never yield a shorter operation
        for end in (BRANCH_HEX.len() + 2..TRANSACTION_HEX.len()).step_by(2) {
            assert!(
                unforge(&TRANSACTION_HEX[..end]).is_err(),
                "prefix of length {} decoded",
                end
            );
        }
        assert!(unforge(BRANCH_HEX).is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_bytes() {
        // parameters flag set
        let with_params = format!("{}ff", &TRANSACTION_HEX[..TRANSACTION_HEX.len() - 2]);
        assert!(matches!(
            unforge(&with_params),
            Err(WasmXtzError::InvalidInput(_))
        ));

        // spendable flag neither 0xff nor 0x00
        let bad_flag = format!(
            "{}{}",
            BRANCH_HEX,
            ORIGINATION_BODY_HEX.replace("00ffff0000", "00feff0000")
        );
        assert!(unforge(&bad_flag).is_err());

        // tz2 curve tag in source
        let tz2_source = TRANSACTION_HEX.replacen("080000", "080001", 1);
        assert!(matches!(
            unforge(&tz2_source),
            Err(WasmXtzError::InvalidAddressFormat(_))
        ));
    }

    #[test]
    fn test_rejects_non_tz1_implicit_source() {
        let tz2 = address::encode(PrefixTag::Tz2, &[7u8; 20]).unwrap();
        let mut op = transaction();
        if let Operation::Transaction(tx) = &mut op.contents[0] {
            tx.manager.source = tz2;
        }
        assert!(matches!(
            forge(&op),
            Err(WasmXtzError::InvalidAddressFormat(_))
        ));
    }

    #[test]
    fn test_empty_contents() {
        assert!(matches!(
            forge(&wrap(vec![])),
            Err(WasmXtzError::InvalidInput(_))
        ));
    }
}
