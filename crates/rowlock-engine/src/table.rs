//! Resource lock table: fixed set of independently lockable rows
//!
//! Each row is a single atomic lock bit. Acquisition is a compare-and-swap
//! that never waits; release is an unconditional swap back to free. Rows are
//! created once and never destroyed.

use std::sync::atomic::{AtomicBool, Ordering};

use rowlock_common::{LockError, Result};

/// One lockable row. Owns nothing besides its lock bit.
#[derive(Debug, Default)]
struct ResourceRow {
    held: AtomicBool,
}

/// Fixed-size table of row locks
#[derive(Debug)]
pub struct ResourceLockTable {
    rows: Vec<ResourceRow>,
}

impl ResourceLockTable {
    /// Create a table with rows `0..rows`, all free
    pub fn new(rows: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| ResourceRow::default()).collect(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn row(&self, row: usize) -> Result<&ResourceRow> {
        self.rows.get(row).ok_or_else(|| {
            LockError::UnknownRow {
                row,
                rows: self.rows.len(),
            }
            .into()
        })
    }

    /// Check that `row` exists without touching its lock
    pub fn check_row(&self, row: usize) -> Result<()> {
        self.row(row).map(|_| ())
    }

    /// Single non-blocking acquisition.
    ///
    /// Returns `Ok(true)` iff the caller now holds the row and `Ok(false)`
    /// immediately if someone else does.
    pub fn try_acquire(&self, row: usize) -> Result<bool> {
        Ok(self
            .row(row)?
            .held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok())
    }

    /// Release a row acquired by the caller.
    ///
    /// # Panics
    ///
    /// Panics if the row is not held. Acquire and release must be strictly
    /// paired; an unpaired release means the caller's bookkeeping is broken.
    pub fn release(&self, row: usize) {
        let Some(slot) = self.rows.get(row) else {
            panic!("release of unknown row {row} (table has {} rows)", self.rows.len());
        };
        let was_held = slot.held.swap(false, Ordering::Release);
        assert!(was_held, "release of row {row} which is not held");
    }

    /// Try to acquire `row`, returning a guard that releases it on drop
    pub fn try_lock(&self, row: usize) -> Result<Option<RowGuard<'_>>> {
        Ok(self
            .try_acquire(row)?
            .then(|| RowGuard { table: self, row }))
    }

    /// Whether `row` is currently held (snapshot)
    pub fn is_held(&self, row: usize) -> Result<bool> {
        Ok(self.row(row)?.held.load(Ordering::Acquire))
    }

    /// Number of rows currently held (snapshot)
    pub fn held_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.held.load(Ordering::Relaxed))
            .count()
    }
}

/// Holds one row for the duration of a critical section
#[derive(Debug)]
pub struct RowGuard<'a> {
    table: &'a ResourceLockTable,
    row: usize,
}

impl RowGuard<'_> {
    pub fn row(&self) -> usize {
        self.row
    }
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        self.table.release(self.row);
    }
}
