//! Interfaces of the chain-state collaborators the runtime reads and writes.

use alloy_primitives::{Address, B256, U256};

/// Error raised by a chain-state collaborator, propagated verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StateError(String);

impl StateError {
    /// Creates a state error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Prepaid energy balances of accounts.
pub trait EnergyLedger {
    /// Debits `amount` from `addr`; returns whether the balance was sufficient.
    ///
    /// An insufficient balance is not an error: the caller decides whether another account
    /// may pay instead.
    fn sub(&mut self, addr: Address, amount: U256) -> Result<bool, StateError>;

    /// Credits `amount` to `addr`.
    fn add(&mut self, addr: Address, amount: U256) -> Result<(), StateError>;
}

/// On-chain governance parameters.
pub trait ParamsRegistry {
    /// Reads the parameter stored under `key`; zero when unset.
    fn get(&self, key: B256) -> Result<U256, StateError>;
}

/// Per-contract sponsorship bindings.
///
/// Each contract may register sponsors and grant per-user credit that callers draw on when
/// the contract (or its sponsor) pays for their transactions.
pub trait PrototypeRegistry {
    /// Remaining credit `user` may spend on calls into `contract` at `block_time`.
    fn user_credit(
        &self,
        contract: Address,
        user: Address,
        block_time: u64,
    ) -> Result<U256, StateError>;

    /// Overwrites the credit of `user` on `contract`.
    fn set_user_credit(
        &mut self,
        contract: Address,
        user: Address,
        credit: U256,
        block_time: u64,
    ) -> Result<(), StateError>;

    /// The sponsor currently selected by `contract`.
    fn current_sponsor(&self, contract: Address) -> Result<Address, StateError>;

    /// Whether `addr` is an active sponsor of `contract`.
    fn is_sponsor(&self, contract: Address, addr: Address) -> Result<bool, StateError>;
}
