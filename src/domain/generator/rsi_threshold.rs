//! RSI threshold generator: oversold buys, overbought sells.

use super::PriceStrategy;
use crate::domain::indicator::{IndicatorType, Rsi};
use crate::domain::signal::Intent;

pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct RsiThreshold {
    rsi: Rsi,
    oversold: f64,
    overbought: f64,
}

impl RsiThreshold {
    pub fn new(period: usize) -> Self {
        Self::with_thresholds(period, DEFAULT_OVERSOLD, DEFAULT_OVERBOUGHT)
    }

    pub fn with_thresholds(period: usize, oversold: f64, overbought: f64) -> Self {
        RsiThreshold {
            rsi: Rsi::new(period),
            oversold,
            overbought,
        }
    }
}

impl PriceStrategy for RsiThreshold {
    fn on_new_price(&mut self, price: f64) -> Option<Intent> {
        let rsi = self.rsi.update(price)?;
        if rsi < self.oversold {
            Some(Intent::Buy)
        } else if rsi > self.overbought {
            Some(Intent::Sell)
        } else {
            None
        }
    }

    fn describe(&self) -> String {
        format!(
            "{}<{}|>{}",
            IndicatorType::Rsi(self.rsi.period()),
            self.oversold,
            self.overbought
        )
    }
}
