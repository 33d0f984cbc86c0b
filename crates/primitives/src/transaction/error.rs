/// Errors decoding a transaction from its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxDecodeError {
    /// A typed envelope must carry at least the type tag and one payload byte.
    #[error("typed transaction too short")]
    ShortTypedTx,
    /// The type tag is not allocated.
    #[error("transaction type not supported")]
    TypeNotSupported,
    /// The body payload is not canonical RLP.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
}

/// Errors deriving a signer identity from a transaction signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The signature blob is not 65 bytes (130 for a delegated transaction).
    #[error("invalid signature length")]
    InvalidLength,
    /// Public key recovery failed.
    #[error("invalid signature: {0}")]
    Recovery(#[from] secp256k1::Error),
}

/// The intrinsic gas computation overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("intrinsic gas overflow")]
pub struct IntrinsicGasOverflow;

/// The transaction declares capabilities the caller does not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FeaturesError {
    /// A declared feature bit is outside the supported set.
    #[error("unsupported features")]
    Unsupported,
    /// The reserved trailer carries unused slots.
    #[error("unused reserved slot")]
    UnusedSlot,
}
