//! Open positions and their closed counterparts.

use chrono::{DateTime, Utc};

use super::signal::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Always a positive magnitude; the sign lives in `direction`.
    pub size: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub direction: Direction,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    pub fn notional(&self, price: f64) -> f64 {
        self.size * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.direction.sign()
    }

    /// Spot value at `price`, or at cost when no price has been seen.
    pub fn market_value(&self, price: Option<f64>) -> f64 {
        self.notional(price.unwrap_or(self.entry_price))
    }

    /// A stop of exactly zero means the position carries no stop.
    pub fn should_stop_loss(&self, price: f64) -> bool {
        if self.stop_loss == 0.0 {
            return false;
        }
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub symbol: String,
    pub direction: Direction,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub realized_pnl: f64,
    pub reason: String,
}
