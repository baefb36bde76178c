//! Trade intents and structured signals.

use chrono::{DateTime, Utc};
use std::fmt;

/// Position direction. Long is +1, short is -1 in P&L arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Unsized trade intent produced by the simple price strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Buy,
    Sell,
}

impl Intent {
    pub fn direction(self) -> Direction {
        match self {
            Intent::Buy => Direction::Long,
            Intent::Sell => Direction::Short,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Buy => write!(f, "buy"),
            Intent::Sell => write!(f, "sell"),
        }
    }
}

/// A fully specified entry request: the engine uses every field verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    /// Base-asset units, always positive.
    pub size: f64,
    pub time: DateTime<Utc>,
}

impl Signal {
    pub fn notional(&self) -> f64 {
        self.entry_price * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Long.to_string(), "LONG");
        assert_eq!(Direction::Short.to_string(), "SHORT");
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(Direction::Short.opposite(), Direction::Long);
    }

    #[test]
    fn intent_maps_to_direction() {
        assert_eq!(Intent::Buy.direction(), Direction::Long);
        assert_eq!(Intent::Sell.direction(), Direction::Short);
        assert_eq!(Intent::Sell.to_string(), "sell");
    }

    #[test]
    fn signal_notional() {
        let sig = Signal {
            symbol: "BTCUSDT".into(),
            direction: Direction::Long,
            entry_price: 100.0,
            stop_loss: 90.0,
            size: 5.0,
            time: Utc::now(),
        };
        assert!((sig.notional() - 500.0).abs() < f64::EPSILON);
    }
}
