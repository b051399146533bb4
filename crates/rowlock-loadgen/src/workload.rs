//! Hotspot request mix

use rand::Rng;

use crate::config::LoadgenConfig;

/// One request to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lock(usize),
    Balance(usize),
}

impl Op {
    pub fn row(self) -> usize {
        match self {
            Op::Lock(row) | Op::Balance(row) => row,
        }
    }
}

/// Rows `0..hot` take `hotspot_load` of the traffic, `hot..accounts` the rest
#[derive(Debug, Clone)]
pub struct Workload {
    accounts: usize,
    hot: usize,
    hotspot_load: f64,
    write_ratio: f64,
}

impl Workload {
    pub fn new(config: &LoadgenConfig) -> Self {
        let hot = ((config.accounts as f64) * config.hotspot_fraction) as usize;
        Self {
            accounts: config.accounts,
            hot: hot.min(config.accounts),
            hotspot_load: config.hotspot_load,
            write_ratio: config.write_ratio,
        }
    }

    /// Number of hotspot rows
    pub fn hot_rows(&self) -> usize {
        self.hot
    }

    pub fn choose_row<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let cold = self.accounts - self.hot;
        let use_hot = if self.hot == 0 {
            false
        } else if cold == 0 {
            true
        } else {
            rng.gen_bool(self.hotspot_load)
        };

        if use_hot {
            rng.gen_range(0..self.hot)
        } else {
            rng.gen_range(self.hot..self.accounts)
        }
    }

    pub fn next_op<R: Rng + ?Sized>(&self, rng: &mut R) -> Op {
        let row = self.choose_row(rng);
        if rng.gen_bool(self.write_ratio) {
            Op::Lock(row)
        } else {
            Op::Balance(row)
        }
    }
}
