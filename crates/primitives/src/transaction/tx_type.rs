use serde::{Deserialize, Serialize};

/// Transaction type.
///
/// Typed codes start at 0x51 to avoid ambiguity with Ethereum's typed-transaction codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TxType {
    /// Legacy transaction carrying a gas price coefficient.
    #[default]
    Legacy = 0x00,
    /// Dynamic fee transaction carrying max fee and max priority fee per gas.
    DynamicFee = 0x51,
}

impl TxType {
    /// Wire tag of this type.
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Parses a wire tag; `None` for unknown tags.
    pub const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Legacy),
            0x51 => Some(Self::DynamicFee),
            _ => None,
        }
    }
}
