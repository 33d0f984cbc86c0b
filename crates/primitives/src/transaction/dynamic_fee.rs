use super::{decode_optional_hash, encode_optional_hash, optional_hash_length};
use crate::{Clause, Reserved};
use alloy_primitives::{Bytes, B256, U256};
use alloy_rlp::{length_of_length, Decodable, Encodable, Error as RlpError, Header};
use serde::{Deserialize, Serialize};

/// A dynamic fee transaction body.
///
/// The price charged per gas unit follows the block base fee, capped by `max_fee_per_gas`
/// and tipped by at most `max_priority_fee_per_gas`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDynamicFee {
    /// Last byte of the genesis block id; guards against cross-chain replay.
    pub chain_tag: u8,
    /// Big-endian [`BlockRef`](crate::BlockRef) binding the transaction to a recent block.
    pub block_ref: u64,
    /// Number of blocks past the referenced one during which the transaction stays valid.
    pub expiration: u32,
    /// Actions carried by the transaction, executed in order.
    pub clauses: Vec<Clause>,
    /// Max tip per gas unit paid on top of the block base fee.
    pub max_priority_fee_per_gas: U256,
    /// Max total price per gas unit.
    pub max_fee_per_gas: U256,
    /// Max gas the transaction may consume.
    pub gas: u64,
    /// Id of a transaction this one depends on.
    pub depends_on: Option<B256>,
    /// Sender-chosen value.
    pub nonce: u64,
    /// Reserved trailer carrying the feature bits.
    pub reserved: Reserved,
    /// Raw signature blob; empty while unsigned.
    pub signature: Bytes,
}

impl TxDynamicFee {
    fn fields_len(&self, with_signature: bool) -> usize {
        let mut len = 0;
        len += self.chain_tag.length();
        len += self.block_ref.length();
        len += self.expiration.length();
        len += self.clauses.length();
        len += self.max_priority_fee_per_gas.length();
        len += self.max_fee_per_gas.length();
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
        self.max_priority_fee_per_gas.encode(out);
        self.max_fee_per_gas.encode(out);
        self.gas.encode(out);
        encode_optional_hash(&self.depends_on, out);
        self.nonce.encode(out);
        self.reserved.encode(out);
        if with_signature {
            self.signature.encode(out);
        }
    }

    /// Encodes the body as the canonical list, signature included.
    ///
    /// The leading type byte of the envelope is not part of the body encoding.
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
            max_priority_fee_per_gas: Decodable::decode(buf)?,
            max_fee_per_gas: Decodable::decode(buf)?,
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
}
