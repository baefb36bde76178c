//! Technical indicators over bounded windows.
//!
//! - `sma`: arithmetic moving average of the last `window` values
//! - `ema`: exponential moving average, batch and incremental
//! - `rsi`: incremental Wilder RSI
//! - `atr`: average true range over the last `period` bars
//!
//! Insufficient history is never an error: every indicator answers `None`.

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod sma;

use std::fmt;

pub use atr::calculate_atr;
pub use ema::{calculate_ema, Ema};
pub use rsi::Rsi;
pub use sma::moving_average;

/// Indicator identity plus parameters, used to label generator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorType::Ema(200).to_string(), "EMA(200)");
        assert_eq!(IndicatorType::Rsi(14).to_string(), "RSI(14)");
        assert_eq!(IndicatorType::Atr(14).to_string(), "ATR(14)");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Ema(50), "fast");
        map.insert(IndicatorType::Ema(200), "slow");

        assert_eq!(map.get(&IndicatorType::Ema(50)), Some(&"fast"));
        assert_eq!(map.get(&IndicatorType::Ema(200)), Some(&"slow"));
        assert_eq!(map.get(&IndicatorType::Sma(50)), None);
    }
}
