//! Exchange of proved work into gas credit.

use crate::constants::BLOCK_INTERVAL;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Policy parameters of the work-to-gas exchange.
///
/// The rate decays over time: every `halving_interval` seconds worth of blocks, a unit of
/// work buys half the gas it used to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSchedule {
    /// Work units exchanged for one unit of gas at block 0.
    pub work_factor: u64,
    /// Seconds between two consecutive blocks.
    pub block_interval: u64,
    /// Seconds after which the exchange rate halves.
    pub halving_interval: u64,
}

impl Default for WorkSchedule {
    fn default() -> Self {
        Self {
            work_factor: 1_000,
            block_interval: BLOCK_INTERVAL,
            halving_interval: 365 * 24 * 3_600,
        }
    }
}

impl WorkSchedule {
    /// Converts `work` into a gas credit at the rate in force at `block_num`.
    pub fn work_to_gas(&self, work: U256, block_num: u32) -> u64 {
        let gas = work / U256::from(self.work_factor.max(1));
        let gas = if gas.bit_len() > 64 { u64::MAX } else { gas.to::<u64>() };

        let halvings = u64::from(block_num) * self.block_interval / self.halving_interval.max(1);
        gas.checked_shr(halvings as u32).unwrap_or(0)
    }
}

/// Converts `work` to gas with the default mainnet schedule.
pub fn work_to_gas(work: U256, block_num: u32) -> u64 {
    WorkSchedule::default().work_to_gas(work, block_num)
}
