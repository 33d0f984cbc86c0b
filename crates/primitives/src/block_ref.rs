use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Reference binding a transaction to a recent block.
///
/// The first 4 bytes are the big-endian block number, the remaining 4 bytes are a prefix of
/// the referenced block's id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef(pub [u8; 8]);

impl BlockRef {
    /// Creates a block ref carrying only the block number.
    pub fn new(number: u32) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&number.to_be_bytes());
        Self(bytes)
    }

    /// Creates a block ref from a full block id.
    pub fn from_id(id: &B256) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&id[..8]);
        Self(bytes)
    }

    /// Number of the referenced block.
    pub fn number(&self) -> u32 {
        u32::from_be_bytes(self.0[..4].try_into().expect("4 bytes"))
    }

    /// Whether this ref is a prefix of the given block id.
    pub fn is_prefix_of(&self, id: &B256) -> bool {
        id[..8] == self.0
    }
}

impl From<u64> for BlockRef {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<BlockRef> for u64 {
    fn from(value: BlockRef) -> Self {
        u64::from_be_bytes(value.0)
    }
}
