use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::{length_of_length, Decodable, Encodable, Error as RlpError, Header, EMPTY_STRING_CODE};
use serde::{Deserialize, Serialize};

/// A single action carried by a transaction.
///
/// A clause with a recipient is a transfer or contract call; a clause without one creates a
/// contract endowed with `value` and initialized by `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Recipient of the call; `None` denotes contract creation.
    pub to: Option<Address>,
    /// Amount transferred to the recipient, or endowed to the created contract.
    pub value: U256,
    /// Call input, or initialization code for contract creation.
    pub data: Bytes,
}

impl Clause {
    /// Creates a clause calling `to` with no value and no data.
    pub fn new(to: Address) -> Self {
        Self { to: Some(to), ..Default::default() }
    }

    /// Creates a contract-creation clause.
    pub fn create_contract() -> Self {
        Self::default()
    }

    /// Sets the transferred value.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Sets the call input or init code.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Whether this clause creates a contract.
    pub fn is_creating_contract(&self) -> bool {
        self.to.is_none()
    }

    fn fields_len(&self) -> usize {
        let to_len = match &self.to {
            Some(to) => to.length(),
            None => 1,
        };
        to_len + self.value.length() + self.data.length()
    }
}

impl Encodable for Clause {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        Header { list: true, payload_length: self.fields_len() }.encode(out);
        match &self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.data.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.fields_len();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for Clause {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(RlpError::UnexpectedString)
        }
        let started_len = buf.len();

        let to = if buf.first() == Some(&EMPTY_STRING_CODE) {
            *buf = &buf[1..];
            None
        } else {
            Some(Address::decode(buf)?)
        };
        let this =
            Self { to, value: Decodable::decode(buf)?, data: Decodable::decode(buf)? };

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
