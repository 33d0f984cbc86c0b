use alloy_primitives::Bytes;
use alloy_rlp::{length_of_length, Decodable, Encodable, Error as RlpError, Header, EMPTY_STRING_CODE};
use serde::{Deserialize, Serialize};

/// Feature bits declared by a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Features(pub u32);

impl Features {
    /// VIP-191 gas-fee delegation.
    pub const DELEGATED: Self = Self(1);

    /// Whether the delegated bit is set.
    pub fn is_delegated(&self) -> bool {
        self.0 & Self::DELEGATED.0 != 0
    }

    /// Sets or clears the delegated bit.
    pub fn set_delegated(&mut self, delegated: bool) {
        if delegated {
            self.0 |= Self::DELEGATED.0;
        } else {
            self.0 &= !Self::DELEGATED.0;
        }
    }

    /// Whether every declared bit is within `supported`.
    pub fn is_subset_of(&self, supported: Self) -> bool {
        self.0 & supported.0 == self.0
    }
}

impl Encodable for Features {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl Decodable for Features {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self(u32::decode(buf)?))
    }
}

/// Reserved trailer of a transaction body.
///
/// Carries the declared [`Features`] plus slots kept for future protocol extension. A
/// transaction is only accepted while `unused` is empty.
///
/// The canonical encoding trims trailing empty items: a default trailer encodes as an empty
/// list, and a trailer with features but no unused slots encodes as `[features]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserved {
    /// Declared feature bits.
    pub features: Features,
    /// Slots reserved for future extension.
    pub unused: Vec<Bytes>,
}

impl Reserved {
    /// Creates a trailer with the delegated feature set.
    pub fn delegated() -> Self {
        Self { features: Features::DELEGATED, unused: Vec::new() }
    }

    fn trimmed_items(&self) -> Vec<Vec<u8>> {
        let mut items = Vec::with_capacity(1 + self.unused.len());
        let mut features = Vec::new();
        self.features.encode(&mut features);
        items.push(features);
        for slot in &self.unused {
            let mut item = Vec::new();
            slot.encode(&mut item);
            items.push(item);
        }
        while items.last().map(Vec::as_slice) == Some(&[EMPTY_STRING_CODE]) {
            items.pop();
        }
        items
    }
}

impl Encodable for Reserved {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        let items = self.trimmed_items();
        let payload_length = items.iter().map(Vec::len).sum();
        Header { list: true, payload_length }.encode(out);
        for item in items {
            out.put_slice(&item);
        }
    }

    fn length(&self) -> usize {
        let payload_length: usize = self.trimmed_items().iter().map(Vec::len).sum();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for Reserved {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(RlpError::UnexpectedString)
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        if payload.is_empty() {
            return Ok(Self::default())
        }

        let features = Features::decode(&mut payload)?;
        let mut unused = Vec::new();
        while !payload.is_empty() {
            unused.push(Bytes::decode(&mut payload)?);
        }

        let trimmed = match unused.last() {
            Some(last) => !last.is_empty(),
            None => features.0 != 0,
        };
        if !trimmed {
            return Err(RlpError::Custom("invalid reserved fields: not trimmed"))
        }
        Ok(Self { features, unused })
    }
}
