//! Transaction envelope over the body variants.

use crate::{
    constants::{
        CLAUSE_GAS, CLAUSE_GAS_CONTRACT_CREATION, MAX_TX_WORK_DELAY, TX_DATA_NON_ZERO_GAS,
        TX_DATA_ZERO_GAS, TX_GAS,
    },
    crypto, BlockRef, Clause, Features, Reserved,
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{
    length_of_length, Decodable, Encodable, Error as RlpError, Header, EMPTY_STRING_CODE,
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

mod builder;
mod dynamic_fee;
mod error;
mod legacy;
mod pow;
mod tx_type;

pub use builder::TransactionBuilder;
pub use dynamic_fee::TxDynamicFee;
pub use error::{FeaturesError, IntrinsicGasOverflow, SignatureError, TxDecodeError};
pub use legacy::TxLegacy;
pub use pow::{work_to_gas, WorkSchedule};
pub use tx_type::TxType;

/// A transaction body variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxBody {
    /// Legacy body with a gas price coefficient.
    Legacy(TxLegacy),
    /// Dynamic fee body with fee caps.
    DynamicFee(TxDynamicFee),
}

impl TxBody {
    /// Type of this body.
    pub const fn tx_type(&self) -> TxType {
        match self {
            Self::Legacy(_) => TxType::Legacy,
            Self::DynamicFee(_) => TxType::DynamicFee,
        }
    }

    fn chain_tag(&self) -> u8 {
        match self {
            Self::Legacy(tx) => tx.chain_tag,
            Self::DynamicFee(tx) => tx.chain_tag,
        }
    }

    fn block_ref(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.block_ref,
            Self::DynamicFee(tx) => tx.block_ref,
        }
    }

    fn expiration(&self) -> u32 {
        match self {
            Self::Legacy(tx) => tx.expiration,
            Self::DynamicFee(tx) => tx.expiration,
        }
    }

    fn clauses(&self) -> &[Clause] {
        match self {
            Self::Legacy(tx) => &tx.clauses,
            Self::DynamicFee(tx) => &tx.clauses,
        }
    }

    fn gas(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.gas,
            Self::DynamicFee(tx) => tx.gas,
        }
    }

    fn depends_on(&self) -> Option<B256> {
        match self {
            Self::Legacy(tx) => tx.depends_on,
            Self::DynamicFee(tx) => tx.depends_on,
        }
    }

    fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.nonce,
            Self::DynamicFee(tx) => tx.nonce,
        }
    }

    fn reserved(&self) -> &Reserved {
        match self {
            Self::Legacy(tx) => &tx.reserved,
            Self::DynamicFee(tx) => &tx.reserved,
        }
    }

    fn signature(&self) -> &[u8] {
        match self {
            Self::Legacy(tx) => &tx.signature,
            Self::DynamicFee(tx) => &tx.signature,
        }
    }

    fn set_signature(&mut self, signature: Bytes) {
        match self {
            Self::Legacy(tx) => tx.signature = signature,
            Self::DynamicFee(tx) => tx.signature = signature,
        }
    }

    fn max_fee_per_gas(&self) -> U256 {
        match self {
            Self::Legacy(_) => U256::ZERO,
            Self::DynamicFee(tx) => tx.max_fee_per_gas,
        }
    }

    fn max_priority_fee_per_gas(&self) -> U256 {
        match self {
            Self::Legacy(_) => U256::ZERO,
            Self::DynamicFee(tx) => tx.max_priority_fee_per_gas,
        }
    }

    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match self {
            Self::Legacy(tx) => tx.encode(out),
            Self::DynamicFee(tx) => tx.encode(out),
        }
    }

    fn encode_for_signing(&self, out: &mut dyn alloy_rlp::BufMut) {
        match self {
            Self::Legacy(tx) => tx.encode_for_signing(out),
            Self::DynamicFee(tx) => tx.encode_for_signing(out),
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Self::Legacy(tx) => tx.encoded_len(),
            Self::DynamicFee(tx) => tx.encoded_len(),
        }
    }
}

/// Lazily populated values derived from a transaction body.
///
/// Each field is published exactly once; racing computations are pure, so any winner is
/// correct. The cache never takes part in equality, serialization or encoding.
#[derive(Debug, Clone, Default)]
struct DerivedCache {
    signing_hash: OnceLock<B256>,
    hash: OnceLock<B256>,
    id: OnceLock<B256>,
    origin: OnceLock<Address>,
    delegator: OnceLock<Address>,
    unproved_work: OnceLock<U256>,
    size: OnceLock<u64>,
    intrinsic_gas: OnceLock<u64>,
}

/// An immutable transaction.
///
/// Constructed by decoding wire bytes or by signing a built body; once constructed the body
/// never changes. [`Transaction::with_signature`] returns a new value with a fresh cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    body: TxBody,
    #[serde(skip)]
    cache: DerivedCache,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl Eq for Transaction {}

impl From<TxLegacy> for Transaction {
    fn from(body: TxLegacy) -> Self {
        Self::new(TxBody::Legacy(body))
    }
}

impl From<TxDynamicFee> for Transaction {
    fn from(body: TxDynamicFee) -> Self {
        Self::new(TxBody::DynamicFee(body))
    }
}

impl Transaction {
    /// Wraps a body into a transaction with an empty cache.
    pub fn new(body: TxBody) -> Self {
        Self { body, cache: DerivedCache::default() }
    }

    /// Decodes a transaction from its canonical encoding.
    ///
    /// A payload starting with a list header is a legacy transaction; anything else is a
    /// typed envelope dispatched on its leading tag byte.
    pub fn decode_enveloped(data: &[u8]) -> Result<Self, TxDecodeError> {
        let tx = if data.first().is_some_and(|first| *first > 0x7f) {
            let mut buf = data;
            let body = TxLegacy::decode(&mut buf)?;
            if !buf.is_empty() {
                return Err(RlpError::UnexpectedLength.into())
            }
            Self::new(TxBody::Legacy(body))
        } else {
            Self::decode_typed(data)?
        };
        let _ = tx.cache.size.set(data.len() as u64);
        Ok(tx)
    }

    /// Decodes a typed envelope: the type tag followed by the body payload.
    fn decode_typed(data: &[u8]) -> Result<Self, TxDecodeError> {
        if data.len() <= 1 {
            return Err(TxDecodeError::ShortTypedTx)
        }
        match TxType::from_u8(data[0]) {
            Some(TxType::DynamicFee) => {
                let mut buf = &data[1..];
                let body = TxDynamicFee::decode(&mut buf)?;
                if !buf.is_empty() {
                    return Err(RlpError::UnexpectedLength.into())
                }
                Ok(Self::new(TxBody::DynamicFee(body)))
            }
            _ => Err(TxDecodeError::TypeNotSupported),
        }
    }

    /// Canonical encoding of the transaction.
    ///
    /// Legacy transactions are a bare RLP list; typed transactions are the type byte
    /// followed by the body list.
    pub fn envelope_encoded(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.body.encoded_len() + 1);
        if self.tx_type() != TxType::Legacy {
            out.push(self.tx_type().as_u8());
        }
        self.body.encode(&mut out);
        out.into()
    }

    /// Type of the transaction.
    pub const fn tx_type(&self) -> TxType {
        self.body.tx_type()
    }

    /// Chain tag the transaction is bound to.
    pub fn chain_tag(&self) -> u8 {
        self.body.chain_tag()
    }

    /// Reference to a recent block.
    pub fn block_ref(&self) -> BlockRef {
        BlockRef::from(self.body.block_ref())
    }

    /// Number of blocks past the referenced one during which the transaction stays valid.
    pub fn expiration(&self) -> u32 {
        self.body.expiration()
    }

    /// Whether the transaction has expired at the given block number.
    pub fn is_expired(&self, block_num: u32) -> bool {
        // widen to avoid overflow near the end of the range
        u64::from(block_num) > u64::from(self.block_ref().number()) + u64::from(self.expiration())
    }

    /// Clauses carried by the transaction.
    pub fn clauses(&self) -> &[Clause] {
        self.body.clauses()
    }

    /// Gas provision of the transaction.
    pub fn gas(&self) -> u64 {
        self.body.gas()
    }

    /// Id of the transaction this one depends on.
    pub fn depends_on(&self) -> Option<B256> {
        self.body.depends_on()
    }

    /// Sender-chosen nonce.
    pub fn nonce(&self) -> u64 {
        self.body.nonce()
    }

    /// Declared feature bits.
    pub fn features(&self) -> Features {
        self.body.reserved().features
    }

    /// Raw signature blob.
    pub fn signature(&self) -> &[u8] {
        self.body.signature()
    }

    /// Gas price coefficient; zero for non-legacy transactions.
    pub fn gas_price_coef(&self) -> u8 {
        match &self.body {
            TxBody::Legacy(tx) => tx.gas_price_coef,
            TxBody::DynamicFee(_) => 0,
        }
    }

    /// Max fee per gas; zero for legacy transactions.
    pub fn max_fee_per_gas(&self) -> U256 {
        self.body.max_fee_per_gas()
    }

    /// Max priority fee per gas; zero for legacy transactions.
    pub fn max_priority_fee_per_gas(&self) -> U256 {
        self.body.max_priority_fee_per_gas()
    }

    /// Size of the canonical encoding in bytes, type byte included.
    pub fn size(&self) -> u64 {
        *self.cache.size.get_or_init(|| {
            let mut size = self.body.encoded_len() as u64;
            if self.tx_type() != TxType::Legacy {
                size += 1;
            }
            size
        })
    }

    /// Hash of the transaction fields a sender signs over.
    ///
    /// Typed transactions include the type byte as a prefix.
    pub fn signing_hash(&self) -> B256 {
        *self.cache.signing_hash.get_or_init(|| {
            let mut buf = Vec::new();
            if self.tx_type() != TxType::Legacy {
                buf.push(self.tx_type().as_u8());
            }
            self.body.encode_for_signing(&mut buf);
            keccak256(&buf)
        })
    }

    /// Hash of the full canonical encoding, signature included.
    pub fn hash(&self) -> B256 {
        *self.cache.hash.get_or_init(|| keccak256(self.envelope_encoded()))
    }

    /// Id of the transaction: `blake2b256(signing_hash, origin)`.
    ///
    /// Returns all zeroes when the origin cannot be recovered.
    pub fn id(&self) -> B256 {
        *self.cache.id.get_or_init(|| match self.origin() {
            Ok(origin) => {
                crypto::blake2b256([self.signing_hash().as_slice(), origin.as_slice()])
            }
            Err(_) => B256::ZERO,
        })
    }

    /// Hash a delegator signs over, assuming the given originator.
    ///
    /// Per VIP-191 this equals the transaction id.
    pub fn delegator_signing_hash(&self, origin: Address) -> B256 {
        crypto::blake2b256([self.signing_hash().as_slice(), origin.as_slice()])
    }

    /// Address of the transaction originator, recovered from the signature.
    pub fn origin(&self) -> Result<Address, SignatureError> {
        self.validate_signature_length()?;

        if let Some(cached) = self.cache.origin.get() {
            return Ok(*cached)
        }
        let sig: [u8; 65] =
            self.body.signature()[..65].try_into().expect("length validated above");
        let origin = crypto::recover_signer(&sig, &self.signing_hash())?;
        Ok(*self.cache.origin.get_or_init(|| origin))
    }

    /// Address of the gas-fee delegator; `None` unless the delegated feature is set.
    pub fn delegator(&self) -> Result<Option<Address>, SignatureError> {
        self.validate_signature_length()?;

        if !self.features().is_delegated() {
            return Ok(None)
        }
        if let Some(cached) = self.cache.delegator.get() {
            return Ok(Some(*cached))
        }

        let origin = self.origin()?;
        let sig: [u8; 65] =
            self.body.signature()[65..130].try_into().expect("length validated above");
        let delegator = crypto::recover_signer(&sig, &self.delegator_signing_hash(origin))?;
        Ok(Some(*self.cache.delegator.get_or_init(|| delegator)))
    }

    /// Returns a new transaction with the signature attached.
    ///
    /// For a delegated transaction `sig` is the originator blob followed by the delegator
    /// blob.
    pub fn with_signature(&self, sig: &[u8]) -> Self {
        let mut body = self.body.clone();
        body.set_signature(Bytes::copy_from_slice(sig));
        Self::new(body)
    }

    /// Tests the declared features against the caller's supported set.
    pub fn test_features(&self, supported: Features) -> Result<(), FeaturesError> {
        let reserved = self.body.reserved();
        if !reserved.features.is_subset_of(supported) {
            return Err(FeaturesError::Unsupported)
        }
        if !reserved.unused.is_empty() {
            return Err(FeaturesError::UnusedSlot)
        }
        Ok(())
    }

    /// Intrinsic gas of the transaction, memoized.
    pub fn intrinsic_gas(&self) -> Result<u64, IntrinsicGasOverflow> {
        if let Some(cached) = self.cache.intrinsic_gas.get() {
            return Ok(*cached)
        }
        let gas = intrinsic_gas(self.body.clauses())?;
        Ok(*self.cache.intrinsic_gas.get_or_init(|| gas))
    }

    /// Price per gas unit the sender pays, proved work excluded.
    ///
    /// Legacy transactions price off `legacy_base_gas_price`; dynamic fee transactions
    /// follow the block base fee up to their caps.
    pub fn effective_gas_price(&self, base_fee: Option<U256>, legacy_base_gas_price: U256) -> U256 {
        match &self.body {
            TxBody::Legacy(tx) => tx.gas_price(legacy_base_gas_price),
            TxBody::DynamicFee(tx) => tx
                .max_fee_per_gas
                .min(tx.max_priority_fee_per_gas.saturating_add(base_fee.unwrap_or_default())),
        }
    }

    /// Tip per gas unit the block proposer receives.
    ///
    /// Returns `None` when the base fee exceeds the fee cap; such transactions are rejected
    /// upstream. For legacy transactions both caps collapse to the overall gas price.
    pub fn effective_priority_fee_per_gas(
        &self,
        base_fee: Option<U256>,
        legacy_base_gas_price: U256,
        proved_work: U256,
    ) -> Option<U256> {
        let (max_priority_fee, max_fee) = match &self.body {
            TxBody::Legacy(_) => {
                let overall = self.overall_gas_price(legacy_base_gas_price, proved_work);
                (overall, overall)
            }
            TxBody::DynamicFee(tx) => (tx.max_priority_fee_per_gas, tx.max_fee_per_gas),
        };
        let priority_fee = max_fee.checked_sub(base_fee.unwrap_or_default())?;
        Some(priority_fee.min(max_priority_fee))
    }

    /// Gas price including the proved-work subsidy:
    /// `gas_price + base_gas_price * min(work_to_gas(proved_work), gas) / gas`.
    ///
    /// Only legacy transactions earn a subsidy.
    pub fn overall_gas_price(&self, legacy_base_gas_price: U256, proved_work: U256) -> U256 {
        let TxBody::Legacy(tx) = &self.body else { return self.body.max_fee_per_gas() };

        let gas_price = tx.gas_price(legacy_base_gas_price);
        if proved_work.is_zero() || tx.gas == 0 {
            return gas_price
        }
        let wgas = work_to_gas(proved_work, self.block_ref().number()).min(tx.gas);
        if wgas == 0 {
            return gas_price
        }

        let subsidy =
            U256::from(wgas).saturating_mul(legacy_base_gas_price) / U256::from(tx.gas);
        gas_price.saturating_add(subsidy)
    }

    /// Evaluates the work of this transaction for an assumed origin, per nonce.
    ///
    /// Senders use this to grind nonces for mempool priority. Always zero for non-legacy
    /// transactions.
    pub fn evaluate_work(&self, origin: Address) -> impl Fn(u64) -> U256 {
        let prehash = match &self.body {
            TxBody::Legacy(tx) => Some(tx.work_prehash(origin)),
            TxBody::DynamicFee(_) => None,
        };

        move |nonce| match prehash {
            Some(prehash) => {
                let hash =
                    crypto::blake2b256([prehash.as_slice(), nonce.to_be_bytes().as_slice()]);
                let hash = U256::from_be_bytes(hash.0);
                if hash.is_zero() {
                    U256::MAX
                } else {
                    U256::MAX / hash
                }
            }
            None => U256::ZERO,
        }
    }

    /// Work carried by the transaction's own nonce, memoized.
    ///
    /// Zero for non-legacy transactions and when the origin cannot be recovered.
    pub fn unproved_work(&self) -> U256 {
        if self.tx_type() != TxType::Legacy {
            return U256::ZERO
        }
        if let Some(cached) = self.cache.unproved_work.get() {
            return *cached
        }
        let Ok(origin) = self.origin() else { return U256::ZERO };
        *self.cache.unproved_work.get_or_init(|| self.evaluate_work(origin)(self.body.nonce()))
    }

    /// Unproved work promoted to proved work when the block ref names a real recent block.
    ///
    /// Zero when the ref is at or past the head, when the delay exceeds
    /// [`MAX_TX_WORK_DELAY`], or when the ref is not a prefix of the block's id.
    pub fn proved_work<E>(
        &self,
        head_block_num: u32,
        get_block_id: impl FnOnce(u32) -> Result<B256, E>,
    ) -> Result<U256, E> {
        if self.tx_type() != TxType::Legacy {
            return Ok(U256::ZERO)
        }

        let block_ref = self.block_ref();
        let ref_num = block_ref.number();
        if ref_num >= head_block_num || head_block_num - ref_num > MAX_TX_WORK_DELAY {
            return Ok(U256::ZERO)
        }

        let id = get_block_id(ref_num)?;
        if block_ref.is_prefix_of(&id) {
            Ok(self.unproved_work())
        } else {
            Ok(U256::ZERO)
        }
    }

    fn validate_signature_length(&self) -> Result<(), SignatureError> {
        let expected = if self.features().is_delegated() { 130 } else { 65 };
        if self.body.signature().len() != expected {
            return Err(SignatureError::InvalidLength)
        }
        Ok(())
    }
}

/// Embedded form used inside block bodies: legacy transactions encode as the raw list,
/// typed transactions as a byte string wrapping the envelope.
impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match &self.body {
            TxBody::Legacy(tx) => tx.encode(out),
            body => {
                let payload_length = 1 + body.encoded_len();
                Header { list: false, payload_length }.encode(out);
                out.put_u8(body.tx_type().as_u8());
                body.encode(out);
            }
        }
    }

    fn length(&self) -> usize {
        match &self.body {
            TxBody::Legacy(tx) => tx.encoded_len(),
            body => {
                let payload_length = 1 + body.encoded_len();
                payload_length + length_of_length(payload_length)
            }
        }
    }
}

impl Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        match buf.first() {
            None => Err(RlpError::InputTooShort),
            Some(&first) if first >= 0xc0 => {
                let started_len = buf.len();
                let body = TxLegacy::decode(buf)?;
                let tx = Self::new(TxBody::Legacy(body));
                let _ = tx.cache.size.set((started_len - buf.len()) as u64);
                Ok(tx)
            }
            Some(&first) if first < 0x80 => Err(RlpError::Custom("typed transaction too short")),
            _ => {
                let envelope = Bytes::decode(buf)?;
                let tx = Self::decode_typed(&envelope).map_err(|err| match err {
                    TxDecodeError::ShortTypedTx => {
                        RlpError::Custom("typed transaction too short")
                    }
                    TxDecodeError::TypeNotSupported => {
                        RlpError::Custom("transaction type not supported")
                    }
                    TxDecodeError::Rlp(err) => err,
                })?;
                let _ = tx.cache.size.set(envelope.len() as u64);
                Ok(tx)
            }
        }
    }
}

pub(crate) fn optional_hash_length(hash: &Option<B256>) -> usize {
    match hash {
        Some(hash) => hash.length(),
        None => 1,
    }
}

pub(crate) fn encode_optional_hash(hash: &Option<B256>, out: &mut dyn alloy_rlp::BufMut) {
    match hash {
        Some(hash) => hash.encode(out),
        None => out.put_u8(EMPTY_STRING_CODE),
    }
}

pub(crate) fn decode_optional_hash(buf: &mut &[u8]) -> alloy_rlp::Result<Option<B256>> {
    if buf.first() == Some(&EMPTY_STRING_CODE) {
        *buf = &buf[1..];
        Ok(None)
    } else {
        Ok(Some(B256::decode(buf)?))
    }
}

/// Intrinsic gas cost of a transaction with the given clauses.
pub fn intrinsic_gas(clauses: &[Clause]) -> Result<u64, IntrinsicGasOverflow> {
    if clauses.is_empty() {
        return Ok(TX_GAS + CLAUSE_GAS)
    }

    let mut total = TX_GAS;
    for clause in clauses {
        let clause_gas = if clause.is_creating_contract() {
            CLAUSE_GAS_CONTRACT_CREATION
        } else {
            CLAUSE_GAS
        };
        total = total
            .checked_add(data_gas(&clause.data)?)
            .and_then(|total| total.checked_add(clause_gas))
            .ok_or(IntrinsicGasOverflow)?;
    }
    Ok(total)
}

fn data_gas(data: &[u8]) -> Result<u64, IntrinsicGasOverflow> {
    let non_zero = data.iter().filter(|byte| **byte != 0).count() as u64;
    let zero = data.len() as u64 - non_zero;

    let zero_gas = zero.checked_mul(TX_DATA_ZERO_GAS).ok_or(IntrinsicGasOverflow)?;
    let non_zero_gas =
        non_zero.checked_mul(TX_DATA_NON_ZERO_GAS).ok_or(IntrinsicGasOverflow)?;
    zero_gas.checked_add(non_zero_gas).ok_or(IntrinsicGasOverflow)
}
