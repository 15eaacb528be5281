//! Zarith variable-length integers
//!
//! Non-negative integers of arbitrary size are written as 7-bit groups,
//! least-significant group first. Every byte but the last has its high bit
//! set. Tezos uses this for fees, counters, limits and amounts.

use crate::error::WasmXtzError;
use num_bigint::BigUint;

const GROUP_MASK: u8 = 0x7f;
const CONTINUATION: u8 = 0x80;

/// Encode a non-negative integer
///
/// `0` encodes to a single `0x00` byte. The most-significant group is never
/// an all-zero group.
pub fn encode(value: &BigUint) -> Vec<u8> {
    let mut rest = value.clone();
    let mut out = Vec::with_capacity((value.bits() as usize / 7) + 1);
    loop {
        let group = low_group(&rest);
        rest >>= 7usize;
        if rest.bits() == 0 {
            out.push(group);
            return out;
        }
        out.push(group | CONTINUATION);
    }
}

/// Decode an integer from the front of `bytes`
///
/// Returns the value and the number of bytes consumed. Trailing bytes after
/// the terminating byte are left untouched.
pub fn decode(bytes: &[u8]) -> Result<(BigUint, usize), WasmXtzError> {
    let end = find_varint_end(bytes)?;
    if end > 1 && bytes[end - 1] == 0x00 {
        return Err(WasmXtzError::MalformedVarint(
            "non-canonical encoding: trailing zero group".to_string(),
        ));
    }

    // Last consumed byte holds the most significant bits
    let mut value = BigUint::default();
    for byte in bytes[..end].iter().rev() {
        value = (value << 7usize) | BigUint::from(byte & GROUP_MASK);
    }
    Ok((value, end))
}

/// Index just past the first byte whose continuation bit is clear
pub fn find_varint_end(bytes: &[u8]) -> Result<usize, WasmXtzError> {
    bytes
        .iter()
        .position(|b| b & CONTINUATION == 0)
        .map(|i| i + 1)
        .ok_or_else(|| {
            WasmXtzError::MalformedVarint(format!(
                "no terminating byte in {} bytes",
                bytes.len()
            ))
        })
}

fn low_group(value: &BigUint) -> u8 {
    let low = value.to_u32_digits().first().copied().unwrap_or(0);
    (low as u8) & GROUP_MASK
}
