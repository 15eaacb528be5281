use crate::error::WasmIacError;
use crate::payload::{EthereumUnsigned, UnsignedBody};
use crate::rlp::RlpItem;
use crate::serializer::PayloadSerializer;

/// æternity ERC-20 token contract on Ethereum mainnet
pub const AE_TOKEN_CONTRACT: [u8; 20] = [
    0x5c, 0xa9, 0xa7, 0x1b, 0x1d, 0x01, 0x84, 0x9c, 0x0a, 0x95, 0x49, 0x0c, 0xc0, 0x05, 0x59, 0x71,
    0x7f, 0xcf, 0x0d, 0x1d,
];

/// `transfer(address,uint256)`
const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const ERC20_TRANSFER_DATA_LEN: usize = 4 + 32 + 32;
const ADDRESS_LEN: usize = 20;

/// Ethereum payloads for one chain, optionally restricted to one ERC-20 token
#[derive(Debug, Clone)]
pub struct EthereumSerializer {
    pub chain_id: u64,
    pub token_contract: Option<[u8; 20]>,
}

impl EthereumSerializer {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            token_contract: None,
        }
    }

    pub fn erc20(chain_id: u64, token_contract: [u8; 20]) -> Self {
        Self {
            chain_id,
            token_contract: Some(token_contract),
        }
    }

    fn check(&self, tx: &EthereumUnsigned) -> Result<(), WasmIacError> {
        if tx.to.len() != ADDRESS_LEN {
            return Err(WasmIacError::InvalidPayload(format!(
                "Recipient must be {} bytes, got {}",
                ADDRESS_LEN,
                tx.to.len()
            )));
        }
        if tx.chain_id != self.chain_id {
            return Err(WasmIacError::InvalidPayload(format!(
                "Chain id {} does not match protocol chain id {}",
                tx.chain_id, self.chain_id
            )));
        }
        if let Some(contract) = &self.token_contract {
            if tx.to.as_slice() != contract {
                return Err(WasmIacError::InvalidPayload(format!(
                    "Token transfer must target contract 0x{}",
                    hex::encode(contract)
                )));
            }
            if tx.data.len() != ERC20_TRANSFER_DATA_LEN
                || !tx.data.starts_with(&ERC20_TRANSFER_SELECTOR)
            {
                return Err(WasmIacError::InvalidPayload(
                    "Token transaction data is not an ERC-20 transfer".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl PayloadSerializer for EthereumSerializer {
    fn serialize_unsigned_body(&self, body: &UnsignedBody) -> Result<RlpItem, WasmIacError> {
        let UnsignedBody::Ethereum(tx) = body else {
            return Err(WasmIacError::InvalidPayload(
                "Ethereum protocol requires an Ethereum transaction".to_string(),
            ));
        };
        self.check(tx)?;
        Ok(RlpItem::List(vec![
            RlpItem::biguint(&tx.nonce),
            RlpItem::biguint(&tx.gas_price),
            RlpItem::biguint(&tx.gas_limit),
            RlpItem::bytes(tx.to.clone()),
            RlpItem::biguint(&tx.value),
            RlpItem::uint(tx.chain_id),
            RlpItem::bytes(tx.data.clone()),
        ]))
    }

    fn deserialize_unsigned_body(&self, tree: &RlpItem) -> Result<UnsignedBody, WasmIacError> {
        let items = tree.as_fixed_list("Ethereum transaction", 7)?;
        let tx = EthereumUnsigned {
            nonce: items[0].as_biguint("nonce")?,
            gas_price: items[1].as_biguint("gas price")?,
            gas_limit: items[2].as_biguint("gas limit")?,
            to: items[3].as_bytes("recipient")?.to_vec(),
            value: items[4].as_biguint("value")?,
            chain_id: items[5].as_u64("chain id")?,
            data: items[6].as_bytes("data")?.to_vec(),
        };
        self.check(&tx)?;
        Ok(UnsignedBody::Ethereum(tx))
    }

    fn validate_signed(&self, signed: &[u8]) -> Result<(), WasmIacError> {
        if signed.is_empty() {
            return Err(WasmIacError::InvalidPayload(
                "Signed Ethereum transaction is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Payload, UnsignedTransaction};
    use num_bigint::BigUint;

    fn transfer(to: Vec<u8>, data: Vec<u8>) -> EthereumUnsigned {
        EthereumUnsigned {
            nonce: BigUint::from(9u8),
            gas_price: BigUint::from(20_000_000_000u64),
            gas_limit: BigUint::from(21_000u32),
            to,
            value: BigUint::from(10u64).pow(18),
            chain_id: 1,
            data,
        }
    }

    fn erc20_data() -> Vec<u8> {
        let mut data = ERC20_TRANSFER_SELECTOR.to_vec();
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(&[0x35; 20]);
        data.extend_from_slice(&[0u8; 31]);
        data.push(0x64);
        data
    }

    #[test]
    fn test_unsigned_roundtrip() {
        let serializer = EthereumSerializer::new(1);
        let payload = Payload::UnsignedTransaction(UnsignedTransaction {
            transaction: UnsignedBody::Ethereum(transfer(vec![0x35; 20], vec![])),
            public_key: "03f1".to_string(),
            callback: None,
        });
        let tree = serializer.serialize(&payload).unwrap();
        assert_eq!(
            serializer
                .deserialize(payload.message_type(), &tree)
                .unwrap(),
            payload
        );
    }

    #[test]
    fn test_known_body_encoding() {
        let serializer = EthereumSerializer::new(1);
        let mut tx = transfer(vec![0x35; 20], vec![]);
        tx.value = BigUint::default();
        let tree = serializer
            .serialize_unsigned_body(&UnsignedBody::Ethereum(tx))
            .unwrap();
        let encoded = hex::encode(crate::rlp::encode(&tree));
        // nonce 09, gas price 85 04a817c800, gas limit 82 5208, to 94 + 20 bytes,
        // value 80, chain id 01, data 80
        let expected = format!("e209{}{}94{}800180", "8504a817c800", "825208", "35".repeat(20));
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_rejects_wrong_chain_and_address() {
        let serializer = EthereumSerializer::new(1);
        let mut tx = transfer(vec![0x35; 20], vec![]);
        tx.chain_id = 3;
        assert!(serializer
            .serialize_unsigned_body(&UnsignedBody::Ethereum(tx))
            .is_err());

        let tx = transfer(vec![0x35; 19], vec![]);
        assert!(serializer
            .serialize_unsigned_body(&UnsignedBody::Ethereum(tx))
            .is_err());
    }

    #[test]
    fn test_token_serializer_requires_transfer_to_contract() {
        let serializer = EthereumSerializer::erc20(1, AE_TOKEN_CONTRACT);

        let plain = transfer(vec![0x35; 20], vec![]);
        assert!(serializer
            .serialize_unsigned_body(&UnsignedBody::Ethereum(plain))
            .is_err());

        let wrong_data = transfer(AE_TOKEN_CONTRACT.to_vec(), vec![0xa9, 0x05]);
        assert!(serializer
            .serialize_unsigned_body(&UnsignedBody::Ethereum(wrong_data))
            .is_err());

        let token = transfer(AE_TOKEN_CONTRACT.to_vec(), erc20_data());
        assert!(serializer
            .serialize_unsigned_body(&UnsignedBody::Ethereum(token))
            .is_ok());
    }

    #[test]
    fn test_contract_constant() {
        assert_eq!(
            hex::encode(AE_TOKEN_CONTRACT),
            "5ca9a71b1d01849c0a95490cc00559717fcf0d1d"
        );
    }
}
