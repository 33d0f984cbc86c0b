use super::{decode_optional_hash, encode_optional_hash, optional_hash_length};
use crate::{crypto::blake2b256, Clause, Reserved};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{length_of_length, Decodable, Encodable, Error as RlpError, Header};
use serde::{Deserialize, Serialize};

/// A legacy transaction body.
///
/// The gas price is not carried explicitly: it is the network base gas price scaled by
/// `gas_price_coef`, optionally subsidized by proof of work over the nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLegacy {
    /// Last byte of the genesis block id; guards against cross-chain replay.
    pub chain_tag: u8,
    /// Big-endian [`BlockRef`](crate::BlockRef) binding the transaction to a recent block.
    pub block_ref: u64,
    /// Number of blocks past the referenced one during which the transaction stays valid.
    pub expiration: u32,
    /// Actions carried by the transaction, executed in order.
    pub clauses: Vec<Clause>,
    /// Coefficient scaling the base gas price, in units of 1/255.
    pub gas_price_coef: u8,
    /// Max gas the transaction may consume.
    pub gas: u64,
    /// Id of a transaction this one depends on.
    pub depends_on: Option<B256>,
    /// Sender-chosen value; also the search variable of the work evaluation.
    pub nonce: u64,
    /// Reserved trailer carrying the feature bits.
    pub reserved: Reserved,
    /// Raw signature blob; empty while unsigned.
    pub signature: Bytes,
}

impl TxLegacy {
    fn fields_len(&self, with_signature: bool) -> usize {
        let mut len = 0;
        len += self.chain_tag.length();
        len += self.block_ref.length();
        len += self.expiration.length();
        len += self.clauses.length();
        len += self.gas_price_coef.length();
        len += self.gas.length();
        len += optional_hash_length(&self.depends_on);
        len += self.nonce.length();
        len += self.reserved.length();
        if with_signature {
            len += self.signature.length();
        }
        len
    }

    fn encode_fields(&self, out: &mut dyn alloy_rlp::BufMut, with_signature: bool) {
        self.chain_tag.encode(out);
        self.block_ref.encode(out);
        self.expiration.encode(out);
        self.clauses.encode(out);
        self.gas_price_coef.encode(out);
        self.gas.encode(out);
        encode_optional_hash(&self.depends_on, out);
        self.nonce.encode(out);
        self.reserved.encode(out);
        if with_signature {
            self.signature.encode(out);
        }
    }

    /// Encodes the body as the canonical list, signature included.
    pub(crate) fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        Header { list: true, payload_length: self.fields_len(true) }.encode(out);
        self.encode_fields(out, true);
    }

    /// Encodes the signing form of the body: the canonical list without the signature.
    pub(crate) fn encode_for_signing(&self, out: &mut dyn alloy_rlp::BufMut) {
        Header { list: true, payload_length: self.fields_len(false) }.encode(out);
        self.encode_fields(out, false);
    }

    /// Length of the canonical encoding, list header included.
    pub(crate) fn encoded_len(&self) -> usize {
        let payload_length = self.fields_len(true);
        payload_length + length_of_length(payload_length)
    }

    pub(crate) fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(RlpError::UnexpectedString)
        }
        let started_len = buf.len();

        let this = Self {
            chain_tag: Decodable::decode(buf)?,
            block_ref: Decodable::decode(buf)?,
            expiration: Decodable::decode(buf)?,
            clauses: Decodable::decode(buf)?,
            gas_price_coef: Decodable::decode(buf)?,
            gas: Decodable::decode(buf)?,
            depends_on: decode_optional_hash(buf)?,
            nonce: Decodable::decode(buf)?,
            reserved: Decodable::decode(buf)?,
            signature: Decodable::decode(buf)?,
        };

        let consumed = started_len - buf.len();
        if consumed != header.payload_length {
            return Err(RlpError::ListLengthMismatch {
                expected: header.payload_length,
                got: consumed,
            })
        }
        Ok(this)
    }

    /// Gas price charged per unit: `base + base * coef / 255`.
    pub(crate) fn gas_price(&self, base_gas_price: U256) -> U256 {
        base_gas_price
            .saturating_add(base_gas_price.saturating_mul(U256::from(self.gas_price_coef)) / U256::from(255u8))
    }

    /// Digest of the body with the nonce and signature left out and `origin` appended.
    ///
    /// The nonce is excluded so a sender can grind nonces against a fixed prefix when
    /// searching for work.
    pub(crate) fn work_prehash(&self, origin: Address) -> B256 {
        let mut payload_length = 0;
        payload_length += self.chain_tag.length();
        payload_length += self.block_ref.length();
        payload_length += self.expiration.length();
        payload_length += self.clauses.length();
        payload_length += self.gas_price_coef.length();
        payload_length += self.gas.length();
        payload_length += optional_hash_length(&self.depends_on);
        payload_length += self.reserved.length();
        payload_length += origin.length();

        let mut encoded = Vec::with_capacity(payload_length + 3);
        Header { list: true, payload_length }.encode(&mut encoded);
        self.chain_tag.encode(&mut encoded);
        self.block_ref.encode(&mut encoded);
        self.expiration.encode(&mut encoded);
        self.clauses.encode(&mut encoded);
        self.gas_price_coef.encode(&mut encoded);
        self.gas.encode(&mut encoded);
        encode_optional_hash(&self.depends_on, &mut encoded);
        self.reserved.encode(&mut encoded);
        origin.encode(&mut encoded);

        blake2b256([encoded.as_slice()])
    }
}
