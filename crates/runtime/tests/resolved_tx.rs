//! Gas-payer selection scenarios against an in-memory state.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{address, b256, Address, B256, U256};
use thor_primitives::{
    constants::KEY_LEGACY_TX_BASE_GAS_PRICE,
    crypto::{secret_to_address, sign_hash},
    BlockRef, Clause, Features, Transaction, TransactionBuilder,
};
use thor_runtime::{
    BuyGasError, EnergyLedger, ParamsRegistry, PrototypeRegistry, ResolveError,
    ResolvedTransaction, StateError,
};

const ORIGIN_SECRET: B256 =
    b256!("7582be841ca040aa940fff6c05773129e135623e41acce3e0b8ba520dc1ae26a");
const DELEGATOR_SECRET: B256 =
    b256!("321d6443bc6177273b5abf54210fe806d451d6b7973bccc2384ef78bbcd0bf51");

const CONTRACT: Address = address!("cccccccccccccccccccccccccccccccccccccccc");
const SPONSOR: Address = address!("5555555555555555555555555555555555555555");

const BLOCK_TIME: u64 = 1_530_014_400;

/// In-memory stand-in for the energy, params and prototype built-ins.
#[derive(Debug, Default)]
struct MemState {
    energy: HashMap<Address, U256>,
    params: HashMap<B256, U256>,
    credit: HashMap<(Address, Address), U256>,
    sponsor: HashMap<Address, Address>,
    active_sponsors: HashSet<(Address, Address)>,
    fail_params: bool,
}

impl MemState {
    fn with_base_gas_price(base_gas_price: U256) -> Self {
        let mut state = Self::default();
        state.params.insert(KEY_LEGACY_TX_BASE_GAS_PRICE, base_gas_price);
        state
    }

    fn fund(mut self, addr: Address, amount: U256) -> Self {
        self.energy.insert(addr, amount);
        self
    }

    fn grant_credit(mut self, contract: Address, user: Address, credit: U256) -> Self {
        self.credit.insert((contract, user), credit);
        self
    }

    fn with_sponsor(mut self, contract: Address, sponsor: Address, active: bool) -> Self {
        self.sponsor.insert(contract, sponsor);
        if active {
            self.active_sponsors.insert((contract, sponsor));
        }
        self
    }

    fn balance(&self, addr: Address) -> U256 {
        self.energy.get(&addr).copied().unwrap_or_default()
    }
}

impl EnergyLedger for MemState {
    fn sub(&mut self, addr: Address, amount: U256) -> Result<bool, StateError> {
        let balance = self.balance(addr);
        if balance < amount {
            return Ok(false)
        }
        self.energy.insert(addr, balance - amount);
        Ok(true)
    }

    fn add(&mut self, addr: Address, amount: U256) -> Result<(), StateError> {
        let balance = self.balance(addr);
        self.energy.insert(addr, balance.saturating_add(amount));
        Ok(())
    }
}

impl ParamsRegistry for MemState {
    fn get(&self, key: B256) -> Result<U256, StateError> {
        if self.fail_params {
            return Err(StateError::new("params storage unavailable"))
        }
        Ok(self.params.get(&key).copied().unwrap_or_default())
    }
}

impl PrototypeRegistry for MemState {
    fn user_credit(
        &self,
        contract: Address,
        user: Address,
        _block_time: u64,
    ) -> Result<U256, StateError> {
        Ok(self.credit.get(&(contract, user)).copied().unwrap_or_default())
    }

    fn set_user_credit(
        &mut self,
        contract: Address,
        user: Address,
        credit: U256,
        _block_time: u64,
    ) -> Result<(), StateError> {
        self.credit.insert((contract, user), credit);
        Ok(())
    }

    fn current_sponsor(&self, contract: Address) -> Result<Address, StateError> {
        Ok(self.sponsor.get(&contract).copied().unwrap_or_default())
    }

    fn is_sponsor(&self, contract: Address, addr: Address) -> Result<bool, StateError> {
        Ok(self.active_sponsors.contains(&(contract, addr)))
    }
}

fn base_gas_price() -> U256 {
    // 10^9
    U256::from(1_000_000_000u64)
}

fn plenty() -> U256 {
    // 10^21
    U256::from(10u64).pow(U256::from(21u64))
}

fn sign(tx: Transaction, secret: B256) -> Transaction {
    let sig = sign_hash(secret, tx.signing_hash()).unwrap();
    tx.with_signature(&sig)
}

fn sign_delegated(tx: Transaction, origin_secret: B256, delegator_secret: B256) -> Transaction {
    let origin = secret_to_address(origin_secret).unwrap();
    let origin_sig = sign_hash(origin_secret, tx.signing_hash()).unwrap();
    let delegator_sig =
        sign_hash(delegator_secret, tx.delegator_signing_hash(origin)).unwrap();

    let mut sig = Vec::with_capacity(130);
    sig.extend_from_slice(&origin_sig);
    sig.extend_from_slice(&delegator_sig);
    tx.with_signature(&sig)
}

fn transfer_tx(gas: u64) -> Transaction {
    sign(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .gas(gas)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    )
}

fn resolve(tx: Transaction) -> ResolvedTransaction {
    ResolvedTransaction::resolve(tx, Features::DELEGATED).unwrap()
}

#[test]
fn origin_pays() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());

    let resolved = resolve(transfer_tx(21_000));
    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();

    let prepaid = U256::from(21_000u64) * base_gas_price();
    assert_eq!(purchase.payer, origin);
    assert_eq!(purchase.prepaid, prepaid);
    assert_eq!(purchase.base_gas_price, base_gas_price());
    assert_eq!(purchase.effective_gas_price, base_gas_price());
    assert_eq!(state.balance(origin), plenty() - prepaid);

    // nothing left over: the net debit is exactly the prepaid amount
    purchase.release_gas(&mut state, 0).unwrap();
    assert_eq!(state.balance(origin), plenty() - prepaid);
}

#[test]
fn release_returns_unspent_gas() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());

    let resolved = resolve(transfer_tx(21_000));
    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();

    purchase.release_gas(&mut state, 1_000).unwrap();
    let consumed = U256::from(20_000u64) * base_gas_price();
    assert_eq!(state.balance(origin), plenty() - consumed);
}

#[test]
fn delegator_pays() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let delegator = secret_to_address(DELEGATOR_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price())
        .fund(origin, plenty())
        .fund(delegator, plenty());

    let tx = sign_delegated(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .gas(21_000)
            .nonce(7)
            .delegated()
            .build(),
        ORIGIN_SECRET,
        DELEGATOR_SECRET,
    );

    let resolved = resolve(tx);
    assert_eq!(resolved.delegator, Some(delegator));

    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();
    assert_eq!(purchase.payer, delegator);
    assert_eq!(state.balance(delegator), plenty() - purchase.prepaid);
    assert_eq!(state.balance(origin), plenty());
}

#[test]
fn broke_delegator_does_not_fall_through() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());

    let tx = sign_delegated(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .gas(21_000)
            .nonce(7)
            .delegated()
            .build(),
        ORIGIN_SECRET,
        DELEGATOR_SECRET,
    );

    let resolved = resolve(tx);
    assert_eq!(
        resolved.buy_gas(&mut state, BLOCK_TIME, None),
        Err(BuyGasError::InsufficientEnergy)
    );
    // the rich origin was never considered
    assert_eq!(state.balance(origin), plenty());
}

#[test]
fn active_sponsor_pays_and_credit_shrinks() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price())
        .fund(origin, plenty())
        .fund(SPONSOR, plenty())
        .with_sponsor(CONTRACT, SPONSOR, true)
        .grant_credit(CONTRACT, origin, plenty());

    // two clauses calling the same contract
    let tx = sign(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .clause(Clause::new(CONTRACT))
            .gas(37_000)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    );

    let resolved = resolve(tx);
    assert_eq!(resolved.common_to(), Some(CONTRACT));

    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();
    assert_eq!(purchase.payer, SPONSOR);
    assert_eq!(state.balance(SPONSOR), plenty() - purchase.prepaid);
    assert_eq!(state.balance(origin), plenty());

    let remaining = 5_000u64;
    purchase.release_gas(&mut state, remaining).unwrap();
    let returned = U256::from(remaining) * base_gas_price();
    assert_eq!(state.balance(SPONSOR), plenty() - purchase.prepaid + returned);

    let consumed = purchase.prepaid - returned;
    assert_eq!(
        state.user_credit(CONTRACT, origin, BLOCK_TIME).unwrap(),
        plenty() - consumed
    );
}

#[test]
fn inactive_sponsor_falls_through_to_contract() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price())
        .fund(origin, plenty())
        .fund(SPONSOR, plenty())
        .fund(CONTRACT, plenty())
        .with_sponsor(CONTRACT, SPONSOR, false)
        .grant_credit(CONTRACT, origin, plenty());

    let resolved = resolve(transfer_tx(21_000));
    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();

    assert_eq!(purchase.payer, CONTRACT);
    assert_eq!(state.balance(CONTRACT), plenty() - purchase.prepaid);
    assert_eq!(state.balance(SPONSOR), plenty());
}

#[test]
fn broke_contract_falls_through_to_origin() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price())
        .fund(origin, plenty())
        .with_sponsor(CONTRACT, SPONSOR, false)
        .grant_credit(CONTRACT, origin, plenty());

    let resolved = resolve(transfer_tx(21_000));
    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();

    assert_eq!(purchase.payer, origin);
    assert_eq!(state.balance(origin), plenty() - purchase.prepaid);
}

#[test]
fn low_credit_disables_sponsorship() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price())
        .fund(origin, plenty())
        .fund(SPONSOR, plenty())
        .with_sponsor(CONTRACT, SPONSOR, true)
        .grant_credit(CONTRACT, origin, U256::from(1u64));

    let resolved = resolve(transfer_tx(21_000));
    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();

    assert_eq!(purchase.payer, origin);
    assert_eq!(state.balance(SPONSOR), plenty());
}

#[test]
fn mixed_recipients_disable_sponsorship() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let other = address!("dddddddddddddddddddddddddddddddddddddddd");
    let mut state = MemState::with_base_gas_price(base_gas_price())
        .fund(origin, plenty())
        .fund(SPONSOR, plenty())
        .fund(CONTRACT, plenty())
        .fund(other, plenty())
        .with_sponsor(CONTRACT, SPONSOR, true)
        .grant_credit(CONTRACT, origin, plenty());

    let tx = sign(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .clause(Clause::new(other))
            .gas(37_000)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    );

    let resolved = resolve(tx);
    assert_eq!(resolved.common_to(), None);

    let purchase = resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap();
    assert_eq!(purchase.payer, origin);
}

#[test]
fn creation_clause_disables_sponsorship() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());

    let tx = sign(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::create_contract())
            .gas(53_000)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    );

    let resolved = resolve(tx);
    assert_eq!(resolved.common_to(), None);
    assert_eq!(resolved.buy_gas(&mut state, BLOCK_TIME, None).unwrap().payer, origin);
}

#[test]
fn dynamic_fee_below_base_fee_is_rejected() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());

    let tx = sign(
        TransactionBuilder::dynamic_fee()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .max_fee_per_gas(U256::from(80u64))
            .max_priority_fee_per_gas(U256::from(10u64))
            .gas(21_000)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    );

    let resolved = resolve(tx);
    assert_eq!(
        resolved.buy_gas(&mut state, BLOCK_TIME, Some(U256::from(100u64))),
        Err(BuyGasError::GasPriceBelowBaseFee)
    );
    assert_eq!(state.balance(origin), plenty());
}

#[test]
fn dynamic_fee_charges_base_fee_plus_tip() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());

    let tx = sign(
        TransactionBuilder::dynamic_fee()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .max_fee_per_gas(U256::from(200u64))
            .max_priority_fee_per_gas(U256::from(10u64))
            .gas(21_000)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    );

    let purchase = resolve(tx).buy_gas(&mut state, BLOCK_TIME, Some(U256::from(100u64))).unwrap();
    assert_eq!(purchase.effective_gas_price, U256::from(110u64));
    assert_eq!(purchase.prepaid, U256::from(21_000u64) * U256::from(110u64));
}

#[test]
fn state_errors_propagate() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let mut state = MemState::with_base_gas_price(base_gas_price()).fund(origin, plenty());
    state.fail_params = true;

    let resolved = resolve(transfer_tx(21_000));
    assert_eq!(
        resolved.buy_gas(&mut state, BLOCK_TIME, None),
        Err(BuyGasError::State(StateError::new("params storage unavailable")))
    );
}

#[test]
fn resolve_rejects_underprovisioned_gas() {
    let tx = transfer_tx(20_999);
    assert_eq!(
        ResolvedTransaction::resolve(tx, Features::DELEGATED),
        Err(ResolveError::IntrinsicGasExceedsGas)
    );
}

#[test]
fn resolve_rejects_inverted_fee_caps() {
    let tx = sign(
        TransactionBuilder::dynamic_fee()
            .chain_tag(1)
            .block_ref(BlockRef::new(10))
            .expiration(32)
            .clause(Clause::new(CONTRACT))
            .max_fee_per_gas(U256::from(10u64))
            .max_priority_fee_per_gas(U256::from(20u64))
            .gas(21_000)
            .nonce(7)
            .build(),
        ORIGIN_SECRET,
    );
    assert_eq!(
        ResolvedTransaction::resolve(tx, Features::DELEGATED),
        Err(ResolveError::PriorityFeeExceedsMaxFee)
    );
}

#[test]
fn resolve_rejects_unsupported_features() {
    let tx = sign(
        TransactionBuilder::legacy()
            .chain_tag(1)
            .clause(Clause::new(CONTRACT))
            .gas(21_000)
            .delegated()
            .build(),
        ORIGIN_SECRET,
    );
    assert!(matches!(
        ResolvedTransaction::resolve(tx, Features(0)),
        Err(ResolveError::Features(_))
    ));
}

#[test]
fn export_execution_context() {
    let origin = secret_to_address(ORIGIN_SECRET).unwrap();
    let resolved = resolve(transfer_tx(21_000));

    let mut ref_id = B256::ZERO;
    ref_id[..8].copy_from_slice(&resolved.block_ref().0);

    let context = resolved
        .to_context(base_gas_price(), origin, 20, |_| Ok::<_, StateError>(ref_id))
        .unwrap();

    assert_eq!(context.id, resolved.id());
    assert_eq!(context.origin, origin);
    assert_eq!(context.gas_payer, origin);
    assert_eq!(context.gas_price, base_gas_price());
    assert_eq!(context.proved_work, resolved.unproved_work());
    assert_eq!(context.block_ref, BlockRef::new(10));
    assert_eq!(context.expiration, 32);
    assert_eq!(context.clause_count, 1);
}
