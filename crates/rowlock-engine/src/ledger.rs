//! Simulated per-row balances
//!
//! Written only by a worker that holds the row; read without locking.

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct Ledger {
    balances: DashMap<usize, i64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the row's balance. Caller must hold the row.
    pub fn credit(&self, row: usize, amount: i64) {
        *self.balances.entry(row).or_insert(0) += amount;
    }

    /// Current balance, 0 for rows never written
    pub fn balance(&self, row: usize) -> i64 {
        self.balances.get(&row).map(|b| *b).unwrap_or(0)
    }
}
