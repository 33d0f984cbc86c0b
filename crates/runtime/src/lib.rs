#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! Transaction resolution and gas-payer selection.
//!
//! [`ResolvedTransaction`] validates a decoded transaction against the state-independent
//! invariants, then [`ResolvedTransaction::buy_gas`] selects the account that prepays for
//! execution against live chain state and hands back a [`GasPurchase`] whose
//! [`release_gas`](GasPurchase::release_gas) returns the unspent part after execution.

mod context;
mod resolved;
mod state;

pub use context::TransactionContext;
pub use resolved::{BuyGasError, GasPurchase, ResolveError, ResolvedTransaction};
pub use state::{EnergyLedger, ParamsRegistry, PrototypeRegistry, StateError};
