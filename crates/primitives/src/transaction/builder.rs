use super::{Transaction, TxBody, TxDynamicFee, TxLegacy};
use crate::{BlockRef, Clause, Features};
use alloy_primitives::{B256, U256};

/// Builder of unsigned transactions.
///
/// Produces a [`Transaction`] with an empty signature; sign its
/// [`signing_hash`](Transaction::signing_hash) and attach the blob with
/// [`with_signature`](Transaction::with_signature).
#[derive(Debug)]
pub struct TransactionBuilder {
    body: TxBody,
}

impl TransactionBuilder {
    /// Starts a legacy transaction.
    pub fn legacy() -> Self {
        Self { body: TxBody::Legacy(TxLegacy::default()) }
    }

    /// Starts a dynamic fee transaction.
    pub fn dynamic_fee() -> Self {
        Self { body: TxBody::DynamicFee(TxDynamicFee::default()) }
    }

    /// Sets the chain tag.
    pub fn chain_tag(mut self, chain_tag: u8) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.chain_tag = chain_tag,
            TxBody::DynamicFee(tx) => tx.chain_tag = chain_tag,
        }
        self
    }

    /// Sets the block reference.
    pub fn block_ref(mut self, block_ref: BlockRef) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.block_ref = block_ref.into(),
            TxBody::DynamicFee(tx) => tx.block_ref = block_ref.into(),
        }
        self
    }

    /// Sets the expiration, in blocks.
    pub fn expiration(mut self, expiration: u32) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.expiration = expiration,
            TxBody::DynamicFee(tx) => tx.expiration = expiration,
        }
        self
    }

    /// Appends a clause.
    pub fn clause(mut self, clause: Clause) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.clauses.push(clause),
            TxBody::DynamicFee(tx) => tx.clauses.push(clause),
        }
        self
    }

    /// Sets the gas provision.
    pub fn gas(mut self, gas: u64) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.gas = gas,
            TxBody::DynamicFee(tx) => tx.gas = gas,
        }
        self
    }

    /// Sets the gas price coefficient; no effect on a dynamic fee transaction.
    pub fn gas_price_coef(mut self, gas_price_coef: u8) -> Self {
        if let TxBody::Legacy(tx) = &mut self.body {
            tx.gas_price_coef = gas_price_coef;
        }
        self
    }

    /// Sets the max fee per gas; no effect on a legacy transaction.
    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        if let TxBody::DynamicFee(tx) = &mut self.body {
            tx.max_fee_per_gas = max_fee_per_gas;
        }
        self
    }

    /// Sets the max priority fee per gas; no effect on a legacy transaction.
    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        if let TxBody::DynamicFee(tx) = &mut self.body {
            tx.max_priority_fee_per_gas = max_priority_fee_per_gas;
        }
        self
    }

    /// Sets the id of the transaction this one depends on.
    pub fn depends_on(mut self, depends_on: B256) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.depends_on = Some(depends_on),
            TxBody::DynamicFee(tx) => tx.depends_on = Some(depends_on),
        }
        self
    }

    /// Sets the nonce.
    pub fn nonce(mut self, nonce: u64) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.nonce = nonce,
            TxBody::DynamicFee(tx) => tx.nonce = nonce,
        }
        self
    }

    /// Declares the feature bits.
    pub fn features(mut self, features: Features) -> Self {
        match &mut self.body {
            TxBody::Legacy(tx) => tx.reserved.features = features,
            TxBody::DynamicFee(tx) => tx.reserved.features = features,
        }
        self
    }

    /// Declares the delegated feature.
    pub fn delegated(self) -> Self {
        let mut features = match &self.body {
            TxBody::Legacy(tx) => tx.reserved.features,
            TxBody::DynamicFee(tx) => tx.reserved.features,
        };
        features.set_delegated(true);
        self.features(features)
    }

    /// Builds the unsigned transaction.
    pub fn build(self) -> Transaction {
        Transaction::new(self.body)
    }
}
