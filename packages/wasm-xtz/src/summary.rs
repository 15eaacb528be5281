//! Human-readable summary of a wrapped operation
//!
//! Used by the offline signer to show what is being signed and by the online
//! wallet to sanity-check a signed response.

use crate::operation::unforge;
use crate::types::{decimal, Operation, OperationKind, WrappedOperation};
use crate::WasmXtzError;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub kind: OperationKind,
    pub from: String,
    /// Destination of a transaction or delegate of a delegation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Transferred amount or origination balance (mutez)
    #[serde(with = "decimal")]
    pub amount: BigUint,
    #[serde(with = "decimal")]
    pub fee: BigUint,
}

pub fn summarize(operation: &WrappedOperation) -> Vec<OperationSummary> {
    operation.contents.iter().map(summarize_operation).collect()
}

/// Unforge then summarize
pub fn summarize_hex(forged_hex: &str) -> Result<Vec<OperationSummary>, WasmXtzError> {
    Ok(summarize(&unforge(forged_hex)?))
}

/// Sum of all fees in the batch
pub fn total_fee(operation: &WrappedOperation) -> BigUint {
    operation
        .contents
        .iter()
        .map(|op| &op.manager().fee)
        .sum()
}

fn summarize_operation(operation: &Operation) -> OperationSummary {
    let manager = operation.manager();
    let (to, amount) = match operation {
        Operation::Reveal(_) => (None, BigUint::default()),
        Operation::Transaction(tx) => (Some(tx.destination.clone()), tx.amount.clone()),
        Operation::Origination(origination) => (None, origination.balance.clone()),
        Operation::Delegation(delegation) => (delegation.delegate.clone(), BigUint::default()),
    };

    OperationSummary {
        kind: operation.kind(),
        from: manager.source.clone(),
        to,
        amount,
        fee: manager.fee.clone(),
    }
}
