//! Tezos operation data model
//!
//! Field names follow the Tezos RPC JSON (`gas_limit`, `manager_pubkey`, ...).
//! Integer fields are arbitrary precision and travel through JSON as decimal
//! strings; numbers are accepted on input.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A branch plus the ordered operations forged together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedOperation {
    /// Recent block hash (`B...`)
    pub branch: String,
    pub contents: Vec<Operation>,
}

/// Fields shared by every manager operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerFields {
    /// `tz1...` or `KT1...`
    pub source: String,
    #[serde(with = "decimal")]
    pub fee: BigUint,
    #[serde(with = "decimal")]
    pub counter: BigUint,
    #[serde(with = "decimal")]
    pub gas_limit: BigUint,
    #[serde(with = "decimal")]
    pub storage_limit: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    #[serde(flatten)]
    pub manager: ManagerFields,
    /// `edpk...`
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub manager: ManagerFields,
    #[serde(with = "decimal")]
    pub amount: BigUint,
    /// `tz1...` or `KT1...`
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origination {
    #[serde(flatten)]
    pub manager: ManagerFields,
    #[serde(with = "decimal")]
    pub balance: BigUint,
    /// Manager public key hash (`tz1...`)
    pub manager_pubkey: String,
    pub spendable: bool,
    pub delegatable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    #[serde(flatten)]
    pub manager: ManagerFields,
    /// Delegate public key hash; `None` withdraws the delegation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegate: Option<String>,
}

/// One manager operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Reveal(Reveal),
    Transaction(Transaction),
    Origination(Origination),
    Delegation(Delegation),
}

impl Operation {
    /// Wire tag of the operation kind
    pub fn kind_tag(&self) -> u8 {
        match self {
            Operation::Reveal(_) => OperationKind::Reveal as u8,
            Operation::Transaction(_) => OperationKind::Transaction as u8,
            Operation::Origination(_) => OperationKind::Origination as u8,
            Operation::Delegation(_) => OperationKind::Delegation as u8,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Reveal(_) => OperationKind::Reveal,
            Operation::Transaction(_) => OperationKind::Transaction,
            Operation::Origination(_) => OperationKind::Origination,
            Operation::Delegation(_) => OperationKind::Delegation,
        }
    }

    pub fn manager(&self) -> &ManagerFields {
        match self {
            Operation::Reveal(op) => &op.manager,
            Operation::Transaction(op) => &op.manager,
            Operation::Origination(op) => &op.manager,
            Operation::Delegation(op) => &op.manager,
        }
    }
}

/// Operation kind tags as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Reveal = 0x07,
    Transaction = 0x08,
    Origination = 0x09,
    Delegation = 0x0a,
}

impl OperationKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x07 => Some(OperationKind::Reveal),
            0x08 => Some(OperationKind::Transaction),
            0x09 => Some(OperationKind::Origination),
            0x0a => Some(OperationKind::Delegation),
            _ => None,
        }
    }
}

/// Serde helpers for `BigUint` as a decimal string
///
/// Accepts strings and non-negative integers, always writes strings so that
/// JavaScript consumers never see a lossy float.
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DecimalVisitor;

        impl de::Visitor<'_> for DecimalVisitor {
            type Value = BigUint;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative integer as number or decimal string")
            }

            fn visit_u64<E>(self, value: u64) -> Result<BigUint, E>
            where
                E: de::Error,
            {
                Ok(BigUint::from(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<BigUint, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(BigUint::from)
                    .map_err(|_| E::custom("value must be non-negative"))
            }

            fn visit_str<E>(self, value: &str) -> Result<BigUint, E>
            where
                E: de::Error,
            {
                parse(value).ok_or_else(|| E::custom(format!("invalid decimal: {}", value)))
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }

    /// Parse a plain decimal string (digits only, no sign)
    pub fn parse(value: &str) -> Option<BigUint> {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        BigUint::parse_bytes(value.as_bytes(), 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_json_shape() {
        let json = r#"{
            "kind": "transaction",
            "source": "tz1YvE7Sfo92ueEPEdZceNWd5MWNeMNSt16L",
            "fee": "50000",
            "counter": 3,
            "gas_limit": "10100",
            "storage_limit": "0",
            "amount": "100000000",
            "destination": "tz1YvE7Sfo92ueEPEdZceNWd5MWNeMNSt16L"
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.kind(), OperationKind::Transaction);
        assert_eq!(op.manager().counter, BigUint::from(3u8));

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["kind"], "transaction");
        assert_eq!(value["counter"], "3");
        assert_eq!(value["amount"], "100000000");
    }

    #[test]
    fn test_rejects_negative_and_float_amounts() {
        let json = r#"{"kind":"delegation","source":"tz1YvE7Sfo92ueEPEdZceNWd5MWNeMNSt16L",
            "fee":"-1","counter":"1","gas_limit":"1","storage_limit":"0"}"#;
        assert!(serde_json::from_str::<Operation>(json).is_err());

        let json = r#"{"kind":"delegation","source":"tz1YvE7Sfo92ueEPEdZceNWd5MWNeMNSt16L",
            "fee":1.5,"counter":"1","gas_limit":"1","storage_limit":"0"}"#;
        assert!(serde_json::from_str::<Operation>(json).is_err());
    }

    #[test]
    fn test_kind_tags() {
        for tag in 0x07..=0x0a {
            assert_eq!(OperationKind::from_tag(tag).map(|k| k as u8), Some(tag));
        }
        assert_eq!(OperationKind::from_tag(0x6b), None);
    }
}
