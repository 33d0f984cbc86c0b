#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! Transaction primitives of a VeChainThor-style chain.
//!
//! This crate contains the immutable [`Transaction`] envelope over its two body variants
//! ([`TxLegacy`] and [`TxDynamicFee`]), the canonical RLP codec, signature-based identity
//! derivation, intrinsic-gas accounting and the proof-of-work priority evaluation for
//! legacy transactions.

mod block_ref;
mod clause;
pub mod constants;
pub mod crypto;
mod reserved;
mod transaction;

pub use block_ref::BlockRef;
pub use clause::Clause;
pub use reserved::{Features, Reserved};
pub use transaction::{
    intrinsic_gas, work_to_gas, FeaturesError, IntrinsicGasOverflow, SignatureError, Transaction,
    TransactionBuilder, TxBody, TxDecodeError, TxDynamicFee, TxLegacy, TxType, WorkSchedule,
};

pub use alloy_primitives::{Address, Bytes, B256, U256};
