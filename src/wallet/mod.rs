//! The wallet adapter: reward/main balance reads and ledger writes.
//!
//! Deliberately thin. Every operation here is already a transactional
//! primitive on [`Store`] -- this module exists so the services layer asks
//! "what can this user spend" and "record that they spent it" without
//! reaching into store internals directly, and so a future on-chain wallet
//! could replace it without touching admission or cancellation. There are
//! no external chain calls; balances are derived entirely from the ledger.

use crate::error::CoreError;
use crate::ids::UserId;
use crate::models::{NewTransaction, Transaction};
use crate::store::{Balance, Store};

pub struct Wallet<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> Wallet<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn balance(&self, tx: &mut S::Tx, user_id: &UserId, token: &str, chain: &str) -> Result<Balance, CoreError> {
        self.store.balance_get(tx, user_id, token, chain).await
    }

    pub async fn record(&self, tx: &mut S::Tx, row: NewTransaction) -> Result<Transaction, CoreError> {
        self.store.transaction_insert(tx, row).await
    }

    pub async fn record_batch(&self, tx: &mut S::Tx, rows: Vec<NewTransaction>) -> Result<Vec<Transaction>, CoreError> {
        self.store.transaction_insert_batch(tx, rows).await
    }
}
