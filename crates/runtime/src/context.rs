use alloy_primitives::{Address, B256, U256};
use thor_primitives::BlockRef;

/// Per-transaction values exported to the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    /// Transaction id.
    pub id: B256,
    /// Transaction originator.
    pub origin: Address,
    /// Account that prepaid for execution.
    pub gas_payer: Address,
    /// Price charged per gas unit.
    pub gas_price: U256,
    /// Work recognized for the transaction at the current head.
    pub proved_work: U256,
    /// Block reference of the transaction.
    pub block_ref: BlockRef,
    /// Expiration of the transaction, in blocks.
    pub expiration: u32,
    /// Number of clauses.
    pub clause_count: u32,
}
