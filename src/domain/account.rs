//! Account bookkeeping: cash, open positions and last-seen prices.
//!
//! `AccountState` is plain data. The engine owns the only instance behind its
//! lock; nothing here synchronizes.

use std::collections::HashMap;

use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountState {
    pub initial_equity: f64,
    pub cash: f64,
    pub positions: HashMap<String, Position>,
    pub last_prices: HashMap<String, f64>,
}

impl AccountState {
    pub fn new(initial_equity: f64) -> Self {
        AccountState {
            initial_equity,
            cash: initial_equity,
            positions: HashMap::new(),
            last_prices: HashMap::new(),
        }
    }

    pub fn add_position(&mut self, position: Position) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn remove_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn record_price(&mut self, symbol: &str, price: f64) {
        self.last_prices.insert(symbol.to_string(), price);
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices.get(symbol).copied()
    }

    /// Inclusive: spending exactly the available cash is allowed.
    pub fn can_afford(&self, required: f64) -> bool {
        required <= self.cash
    }

    /// Sum of unrealized P&L; positions without a last price contribute zero.
    pub fn unrealized_pnl(&self) -> f64 {
        self.positions
            .values()
            .filter_map(|pos| {
                self.last_prices
                    .get(&pos.symbol)
                    .map(|&price| pos.unrealized_pnl(price))
            })
            .sum()
    }

    /// Cash plus every open position at its last seen price, or at its entry
    /// price before the first tick.
    pub fn total_equity(&self) -> f64 {
        let positions: f64 = self
            .positions
            .values()
            .map(|pos| pos.market_value(self.last_price(&pos.symbol)))
            .sum();
        self.cash + positions
    }
}
