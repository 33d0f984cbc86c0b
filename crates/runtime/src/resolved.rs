use crate::{
    state::{EnergyLedger, ParamsRegistry, PrototypeRegistry, StateError},
    TransactionContext,
};
use alloy_primitives::{Address, B256, U256};
use derive_more::Deref;
use thor_primitives::{
    constants::KEY_LEGACY_TX_BASE_GAS_PRICE, Clause, Features, FeaturesError,
    IntrinsicGasOverflow, SignatureError, Transaction, TxType,
};
use tracing::trace;

/// Errors failing transaction resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Origin or delegator could not be derived from the signature.
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// The transaction declares unsupported capabilities.
    #[error(transparent)]
    Features(#[from] FeaturesError),
    /// The intrinsic gas computation overflowed.
    #[error(transparent)]
    IntrinsicGas(#[from] IntrinsicGasOverflow),
    /// The gas provision does not cover the intrinsic gas.
    #[error("intrinsic gas exceeds provided gas")]
    IntrinsicGasExceedsGas,
    /// The clause values sum past 2^256.
    #[error("tx value too large")]
    ValueTooLarge,
    /// The fee cap is below the tip cap.
    #[error("max fee per gas is less than max priority fee per gas")]
    PriorityFeeExceedsMaxFee,
}

/// Errors failing the gas purchase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuyGasError {
    /// The effective gas price cannot cover the block base fee.
    #[error("gas price is less than block base fee")]
    GasPriceBelowBaseFee,
    /// No eligible payer holds enough energy.
    #[error("insufficient energy")]
    InsufficientEnergy,
    /// A chain-state collaborator failed.
    #[error(transparent)]
    State(#[from] StateError),
}

/// A transaction validated against the state-independent invariants.
///
/// Derefs to the inner [`Transaction`].
#[derive(Debug, PartialEq, Eq, Deref)]
pub struct ResolvedTransaction {
    #[deref]
    tx: Transaction,
    /// Address recovered from the originator signature.
    pub origin: Address,
    /// Gas-fee delegator, when the delegated feature is used.
    pub delegator: Option<Address>,
    /// Intrinsic gas of the clauses.
    pub intrinsic_gas: u64,
    /// Clauses of the transaction.
    pub clauses: Vec<Clause>,
}

impl ResolvedTransaction {
    /// Resolves `tx`, validating every invariant that does not require chain state.
    pub fn resolve(tx: Transaction, supported_features: Features) -> Result<Self, ResolveError> {
        tx.test_features(supported_features)?;

        let origin = tx.origin()?;
        let intrinsic_gas = tx.intrinsic_gas()?;
        if tx.gas() < intrinsic_gas {
            return Err(ResolveError::IntrinsicGasExceedsGas)
        }
        let delegator = tx.delegator()?;

        let clauses = tx.clauses().to_vec();
        let mut total_value = U256::ZERO;
        for clause in &clauses {
            total_value =
                total_value.checked_add(clause.value).ok_or(ResolveError::ValueTooLarge)?;
        }

        // the fee bounds themselves are structural for U256; only the ordering needs a check
        if tx.tx_type() != TxType::Legacy
            && tx.max_fee_per_gas() < tx.max_priority_fee_per_gas()
        {
            return Err(ResolveError::PriorityFeeExceedsMaxFee)
        }

        Ok(Self { tx, origin, delegator, intrinsic_gas, clauses })
    }

    /// The transaction being resolved.
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// The unique recipient shared by every clause.
    ///
    /// `None` when there are no clauses, when any clause creates a contract, or when
    /// recipients disagree.
    pub fn common_to(&self) -> Option<Address> {
        let (first, rest) = self.clauses.split_first()?;
        let to = first.to?;
        for clause in rest {
            if clause.to != Some(to) {
                return None
            }
        }
        Some(to)
    }

    /// Debits the prepaid energy for this transaction from the selected payer.
    ///
    /// Payer branches are evaluated in order: the delegator when one signed, the common
    /// recipient's sponsor (or the recipient itself) when the originator holds enough
    /// credit, and finally the originator. A delegator with insufficient energy fails the
    /// purchase outright: the transaction explicitly authorized that payer.
    ///
    /// The caller must wrap the purchase and the execution that follows in a state
    /// checkpoint, and must hand unspent gas back through [`GasPurchase::release_gas`].
    pub fn buy_gas<S>(
        &self,
        state: &mut S,
        block_time: u64,
        base_fee: Option<U256>,
    ) -> Result<GasPurchase, BuyGasError>
    where
        S: EnergyLedger + ParamsRegistry + PrototypeRegistry,
    {
        let base_gas_price = state.get(KEY_LEGACY_TX_BASE_GAS_PRICE)?;
        let effective_gas_price = self.tx.effective_gas_price(base_fee, base_gas_price);
        if let Some(base_fee) = base_fee {
            if effective_gas_price < base_fee {
                return Err(BuyGasError::GasPriceBelowBaseFee)
            }
        }

        // the max total the execution may cost, returned pro rata afterwards
        let prepaid = U256::from(self.tx.gas()).saturating_mul(effective_gas_price);
        let purchase = |payer: Address, credit: Option<SponsorshipCredit>| GasPurchase {
            base_gas_price,
            effective_gas_price,
            payer,
            prepaid,
            block_time,
            credit,
        };

        if let Some(delegator) = self.delegator {
            if state.sub(delegator, prepaid)? {
                trace!(target: "runtime", payer = %delegator, %prepaid, "delegator pays");
                return Ok(purchase(delegator, None))
            }
            return Err(BuyGasError::InsufficientEnergy)
        }

        if let Some(common_to) = self.common_to() {
            let credit = state.user_credit(common_to, self.origin, block_time)?;
            if credit >= prepaid {
                let sponsorship =
                    SponsorshipCredit { contract: common_to, user: self.origin, credit };

                let sponsor = state.current_sponsor(common_to)?;
                if state.is_sponsor(common_to, sponsor)? && state.sub(sponsor, prepaid)? {
                    trace!(target: "runtime", payer = %sponsor, %prepaid, "sponsor pays");
                    return Ok(purchase(sponsor, Some(sponsorship)))
                }
                if state.sub(common_to, prepaid)? {
                    trace!(target: "runtime", payer = %common_to, %prepaid, "recipient pays");
                    return Ok(purchase(common_to, Some(sponsorship)))
                }
            }
        }

        if state.sub(self.origin, prepaid)? {
            trace!(target: "runtime", payer = %self.origin, %prepaid, "origin pays");
            return Ok(purchase(self.origin, None))
        }
        Err(BuyGasError::InsufficientEnergy)
    }

    /// Builds the context exported to the execution engine.
    pub fn to_context<E>(
        &self,
        gas_price: U256,
        gas_payer: Address,
        block_num: u32,
        get_block_id: impl FnOnce(u32) -> Result<B256, E>,
    ) -> Result<TransactionContext, E> {
        let proved_work = self.tx.proved_work(block_num, get_block_id)?;
        Ok(TransactionContext {
            id: self.tx.id(),
            origin: self.origin,
            gas_payer,
            gas_price,
            proved_work,
            block_ref: self.tx.block_ref(),
            expiration: self.tx.expiration(),
            clause_count: self.clauses.len() as u32,
        })
    }
}

/// User credit backing a sponsored purchase, consumed at release time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SponsorshipCredit {
    contract: Address,
    user: Address,
    credit: U256,
}

/// Energy debited up front for a transaction, with everything needed to return the unspent
/// part to the payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPurchase {
    /// Base gas price read from the params registry.
    pub base_gas_price: U256,
    /// Price charged per gas unit.
    pub effective_gas_price: U256,
    /// Account that prepaid.
    pub payer: Address,
    /// `gas × effective_gas_price`, debited before execution.
    pub prepaid: U256,
    block_time: u64,
    credit: Option<SponsorshipCredit>,
}

impl GasPurchase {
    /// Returns the unspent part of the prepayment to the payer.
    ///
    /// This is the only legal path for restoring unspent gas. For a sponsored purchase the
    /// user credit on the contract is lowered by the consumed portion.
    pub fn release_gas<S>(&self, state: &mut S, remaining_gas: u64) -> Result<(), StateError>
    where
        S: EnergyLedger + PrototypeRegistry,
    {
        let returned = U256::from(remaining_gas).saturating_mul(self.effective_gas_price);
        state.add(self.payer, returned)?;
        trace!(target: "runtime", payer = %self.payer, %returned, "unspent gas released");

        if let Some(sponsorship) = &self.credit {
            let used = self.prepaid.saturating_sub(returned);
            state.set_user_credit(
                sponsorship.contract,
                sponsorship.user,
                sponsorship.credit.saturating_sub(used),
                self.block_time,
            )?;
        }
        Ok(())
    }
}
