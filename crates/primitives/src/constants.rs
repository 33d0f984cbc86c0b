//! Protocol constants.

use alloy_primitives::B256;

/// Base gas charged for any transaction.
pub const TX_GAS: u64 = 5_000;

/// Gas charged per call clause (the Ethereum per-tx cost of 21000 minus [`TX_GAS`]).
pub const CLAUSE_GAS: u64 = 21_000 - TX_GAS;

/// Gas charged per contract-creation clause (the Ethereum creation cost of 53000 minus
/// [`TX_GAS`]).
pub const CLAUSE_GAS_CONTRACT_CREATION: u64 = 53_000 - TX_GAS;

/// Gas charged per zero byte of clause data.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Gas charged per non-zero byte of clause data.
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Max number of blocks a transaction's block ref may lag behind the head for its work to
/// still count as proved.
pub const MAX_TX_WORK_DELAY: u32 = 30;

/// Time between two consecutive blocks, in seconds.
pub const BLOCK_INTERVAL: u64 = 10;

/// Params registry key of the base gas price applied to legacy transactions.
pub const KEY_LEGACY_TX_BASE_GAS_PRICE: B256 = params_key(b"legacy-tx-base-gas-price");

/// Builds a params registry key: the ASCII name right-aligned in 32 bytes.
///
/// Panics at compile time if `name` is longer than 32 bytes.
pub const fn params_key(name: &[u8]) -> B256 {
    let mut bytes = [0u8; 32];
    let offset = 32 - name.len();
    let mut i = 0;
    while i < name.len() {
        bytes[offset + i] = name[i];
        i += 1;
    }
    B256::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_key_is_right_aligned() {
        let key = params_key(b"ab");
        assert_eq!(&key[..30], &[0u8; 30]);
        assert_eq!(&key[30..], b"ab");
    }

    #[test]
    fn clause_gas_matches_eth_schedule() {
        assert_eq!(TX_GAS + CLAUSE_GAS, 21_000);
        assert_eq!(TX_GAS + CLAUSE_GAS_CONTRACT_CREATION, 53_000);
    }
}
