//! Recursive length-prefixed encoding (RLP) of nested byte-array trees
//!
//! Only canonical encodings are accepted on decode: a single byte below 0x80
//! must be encoded as itself, short forms must be used when they fit, and
//! lengths carry no leading zero bytes. Together this makes
//! `encode(decode(bytes)) == bytes` for every accepted input.

use crate::error::WasmIacError;
use num_bigint::BigUint;

const SHORT_STRING: u8 = 0x80;
const LONG_STRING: u8 = 0xb7;
const SHORT_LIST: u8 = 0xc0;
const LONG_LIST: u8 = 0xf7;
const SHORT_MAX: usize = 55;

/// Deepest nesting accepted on decode
pub const MAX_DEPTH: usize = 16;

/// A node of the tree: either a byte string or a list of nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        RlpItem::Bytes(bytes.into())
    }

    pub fn string(value: &str) -> Self {
        RlpItem::Bytes(value.as_bytes().to_vec())
    }

    /// Minimal big-endian integer; zero is the empty string
    pub fn uint(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        RlpItem::Bytes(bytes[start..].to_vec())
    }

    pub fn biguint(value: &BigUint) -> Self {
        if *value == BigUint::default() {
            RlpItem::Bytes(Vec::new())
        } else {
            RlpItem::Bytes(value.to_bytes_be())
        }
    }

    /// Optional values travel as a zero- or one-element list
    pub fn optional(value: Option<RlpItem>) -> Self {
        RlpItem::List(value.into_iter().collect())
    }

    pub fn as_bytes(&self, field: &str) -> Result<&[u8], WasmIacError> {
        match self {
            RlpItem::Bytes(bytes) => Ok(bytes),
            RlpItem::List(_) => Err(WasmIacError::InvalidPayload(format!(
                "{} must be a byte string",
                field
            ))),
        }
    }

    pub fn as_list(&self, field: &str) -> Result<&[RlpItem], WasmIacError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(WasmIacError::InvalidPayload(format!(
                "{} must be a list",
                field
            ))),
        }
    }

    /// List with exactly `len` elements
    pub fn as_fixed_list(&self, field: &str, len: usize) -> Result<&[RlpItem], WasmIacError> {
        let items = self.as_list(field)?;
        if items.len() != len {
            return Err(WasmIacError::InvalidPayload(format!(
                "{} must have {} elements, got {}",
                field,
                len,
                items.len()
            )));
        }
        Ok(items)
    }

    pub fn as_string(&self, field: &str) -> Result<String, WasmIacError> {
        String::from_utf8(self.as_bytes(field)?.to_vec())
            .map_err(|_| WasmIacError::InvalidPayload(format!("{} is not valid UTF-8", field)))
    }

    pub fn as_u64(&self, field: &str) -> Result<u64, WasmIacError> {
        let bytes = self.as_integer_bytes(field)?;
        if bytes.len() > 8 {
            return Err(WasmIacError::InvalidPayload(format!(
                "{} does not fit in 64 bits",
                field
            )));
        }
        Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn as_biguint(&self, field: &str) -> Result<BigUint, WasmIacError> {
        Ok(BigUint::from_bytes_be(self.as_integer_bytes(field)?))
    }

    pub fn as_bool(&self, field: &str) -> Result<bool, WasmIacError> {
        match self.as_u64(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WasmIacError::InvalidPayload(format!(
                "{} must be 0 or 1, got {}",
                field, other
            ))),
        }
    }

    pub fn as_optional(&self, field: &str) -> Result<Option<&RlpItem>, WasmIacError> {
        match self.as_list(field)? {
            [] => Ok(None),
            [item] => Ok(Some(item)),
            items => Err(WasmIacError::InvalidPayload(format!(
                "{} must have at most one element, got {}",
                field,
                items.len()
            ))),
        }
    }

    fn as_integer_bytes(&self, field: &str) -> Result<&[u8], WasmIacError> {
        let bytes = self.as_bytes(field)?;
        if bytes.first() == Some(&0) {
            return Err(WasmIacError::InvalidPayload(format!(
                "{} has a leading zero byte",
                field
            )));
        }
        Ok(bytes)
    }
}

pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &RlpItem, out: &mut Vec<u8>) {
    match item {
        RlpItem::Bytes(bytes) if bytes.len() == 1 && bytes[0] < SHORT_STRING => {
            out.push(bytes[0]);
        }
        RlpItem::Bytes(bytes) => {
            encode_header(bytes.len(), SHORT_STRING, LONG_STRING, out);
            out.extend_from_slice(bytes);
        }
        RlpItem::List(items) => {
            let mut body = Vec::new();
            for item in items {
                encode_into(item, &mut body);
            }
            encode_header(body.len(), SHORT_LIST, LONG_LIST, out);
            out.extend_from_slice(&body);
        }
    }
}

fn encode_header(len: usize, short: u8, long: u8, out: &mut Vec<u8>) {
    if len <= SHORT_MAX {
        out.push(short + len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let start = len_bytes.iter().position(|b| *b != 0).unwrap_or(7);
        out.push(long + (len_bytes.len() - start) as u8);
        out.extend_from_slice(&len_bytes[start..]);
    }
}

/// Decode a single item that must span the whole input
pub fn decode(bytes: &[u8]) -> Result<RlpItem, WasmIacError> {
    let (item, consumed) = decode_item(bytes, 0)?;
    if consumed != bytes.len() {
        return Err(WasmIacError::InvalidEncoding(format!(
            "{} trailing bytes after RLP item",
            bytes.len() - consumed
        )));
    }
    Ok(item)
}

fn decode_item(bytes: &[u8], depth: usize) -> Result<(RlpItem, usize), WasmIacError> {
    if depth > MAX_DEPTH {
        return Err(WasmIacError::InvalidEncoding(
            "RLP nesting too deep".to_string(),
        ));
    }
    let prefix = *bytes
        .first()
        .ok_or_else(|| WasmIacError::InvalidEncoding("Empty RLP item".to_string()))?;

    match prefix {
        0x00..=0x7f => Ok((RlpItem::Bytes(vec![prefix]), 1)),
        SHORT_STRING..=LONG_STRING => {
            let len = (prefix - SHORT_STRING) as usize;
            let payload = slice(bytes, 1, len)?;
            if len == 1 && payload[0] < SHORT_STRING {
                return Err(WasmIacError::InvalidEncoding(
                    "Single byte below 0x80 must not carry a prefix".to_string(),
                ));
            }
            Ok((RlpItem::Bytes(payload.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let (len, header) = decode_long_length(bytes, prefix - LONG_STRING)?;
            let payload = slice(bytes, header, len)?;
            Ok((RlpItem::Bytes(payload.to_vec()), header + len))
        }
        SHORT_LIST..=LONG_LIST => {
            let len = (prefix - SHORT_LIST) as usize;
            let body = slice(bytes, 1, len)?;
            Ok((RlpItem::List(decode_list_body(body, depth)?), 1 + len))
        }
        0xf8..=0xff => {
            let (len, header) = decode_long_length(bytes, prefix - LONG_LIST)?;
            let body = slice(bytes, header, len)?;
            Ok((RlpItem::List(decode_list_body(body, depth)?), header + len))
        }
    }
}

fn decode_list_body(mut body: &[u8], depth: usize) -> Result<Vec<RlpItem>, WasmIacError> {
    let mut items = Vec::new();
    while !body.is_empty() {
        let (item, consumed) = decode_item(body, depth + 1)?;
        items.push(item);
        body = &body[consumed..];
    }
    Ok(items)
}

/// Returns (payload length, header length) of a long-form item
fn decode_long_length(bytes: &[u8], len_of_len: u8) -> Result<(usize, usize), WasmIacError> {
    let len_bytes = slice(bytes, 1, len_of_len as usize)?;
    if len_bytes[0] == 0 {
        return Err(WasmIacError::InvalidEncoding(
            "RLP length has a leading zero byte".to_string(),
        ));
    }
    let len = len_bytes
        .iter()
        .try_fold(0usize, |acc, b| {
            acc.checked_mul(256)?.checked_add(usize::from(*b))
        })
        .ok_or_else(|| WasmIacError::InvalidEncoding("RLP length overflow".to_string()))?;
    if len <= SHORT_MAX {
        return Err(WasmIacError::InvalidEncoding(
            "RLP long form used for a short item".to_string(),
        ));
    }
    Ok((len, 1 + len_of_len as usize))
}

fn slice(bytes: &[u8], start: usize, len: usize) -> Result<&[u8], WasmIacError> {
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| {
            WasmIacError::InvalidEncoding(format!(
                "RLP item needs {} bytes, {} available",
                len,
                bytes.len().saturating_sub(start)
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty_string(RlpItem::bytes(vec![]), "80")]
    #[case::single_low_byte(RlpItem::bytes(vec![0x0f]), "0f")]
    #[case::single_high_byte(RlpItem::bytes(vec![0x80]), "8180")]
    #[case::dog(RlpItem::string("dog"), "83646f67")]
    #[case::zero(RlpItem::uint(0), "80")]
    #[case::fifteen(RlpItem::uint(15), "0f")]
    #[case::thousand_twenty_four(RlpItem::uint(1024), "820400")]
    #[case::empty_list(RlpItem::List(vec![]), "c0")]
    #[case::cat_dog(
        RlpItem::List(vec![RlpItem::string("cat"), RlpItem::string("dog")]),
        "c88363617483646f67"
    )]
    #[case::set_theory(
        RlpItem::List(vec![
            RlpItem::List(vec![]),
            RlpItem::List(vec![RlpItem::List(vec![])]),
            RlpItem::List(vec![RlpItem::List(vec![]), RlpItem::List(vec![RlpItem::List(vec![])])]),
        ]),
        "c7c0c1c0c3c0c1c0"
    )]
    fn test_known_vectors(#[case] item: RlpItem, #[case] expected_hex: &str) {
        assert_eq!(hex::encode(encode(&item)), expected_hex);
        assert_eq!(decode(&hex::decode(expected_hex).unwrap()).unwrap(), item);
    }

    #[test]
    fn test_long_string() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        let encoded = encode(&RlpItem::string(text));
        assert_eq!(&encoded[..2], &[0xb8, 0x38]);
        assert_eq!(decode(&encoded).unwrap(), RlpItem::string(text));
    }

    #[test]
    fn test_long_list() {
        let item = RlpItem::List(vec![RlpItem::bytes(vec![0xaa; 300])]);
        let encoded = encode(&item);
        // list body = b9 012c + 300 bytes = 303 bytes
        assert_eq!(&encoded[..3], &[0xf9, 0x01, 0x2f]);
        assert_eq!(decode(&encoded).unwrap(), item);
    }

    #[rstest]
    #[case::empty("")]
    #[case::non_canonical_single_byte("8105")]
    #[case::truncated_string("83646f")]
    #[case::truncated_list("c88363617483646f")]
    #[case::long_form_for_short("b80161")]
    #[case::length_leading_zero("b90038")]
    #[case::trailing_bytes("8000")]
    fn test_rejects_malformed(#[case] input_hex: &str) {
        let err = decode(&hex::decode(input_hex).unwrap()).unwrap_err();
        assert!(matches!(err, WasmIacError::InvalidEncoding(_)));
    }

    #[test]
    fn test_depth_limit() {
        let mut item = RlpItem::List(vec![]);
        for _ in 0..MAX_DEPTH {
            item = RlpItem::List(vec![item]);
        }
        assert!(decode(&encode(&item)).is_ok());

        let too_deep = RlpItem::List(vec![item]);
        assert!(decode(&encode(&too_deep)).is_err());
    }

    #[test]
    fn test_integer_accessors() {
        assert_eq!(RlpItem::uint(0).as_u64("n").unwrap(), 0);
        assert_eq!(RlpItem::uint(u64::MAX).as_u64("n").unwrap(), u64::MAX);
        assert!(RlpItem::bytes(vec![0, 1]).as_u64("n").is_err());
        assert!(RlpItem::bytes(vec![1; 9]).as_u64("n").is_err());

        let big = BigUint::from(1u8) << 200;
        assert_eq!(RlpItem::biguint(&big).as_biguint("n").unwrap(), big);
        assert_eq!(
            RlpItem::biguint(&BigUint::default()),
            RlpItem::bytes(vec![])
        );
    }

    #[test]
    fn test_optional_accessor() {
        let some = RlpItem::optional(Some(RlpItem::string("")));
        assert_eq!(
            some.as_optional("o").unwrap(),
            Some(&RlpItem::string(""))
        );
        assert_eq!(RlpItem::optional(None).as_optional("o").unwrap(), None);

        let two = RlpItem::List(vec![RlpItem::uint(1), RlpItem::uint(2)]);
        assert!(two.as_optional("o").is_err());
        assert!(RlpItem::uint(1).as_optional("o").is_err());
    }

    #[test]
    fn test_bool_accessor() {
        assert!(RlpItem::uint(1).as_bool("b").unwrap());
        assert!(!RlpItem::uint(0).as_bool("b").unwrap());
        assert!(RlpItem::uint(2).as_bool("b").is_err());
    }
}
