//! Trend following with volatility-based risk sizing.
//!
//! Regime comes from an EMA crossover on the higher timeframe, the stop
//! distance from ATR on the lower timeframe. Position size risks a fixed
//! fraction of equity between entry and stop:
//!
//! size = (equity * risk_fraction) / (ATR * stop_multiple)

use crate::domain::bar::Bar;
use crate::domain::indicator::{calculate_atr, calculate_ema, IndicatorType};
use crate::domain::signal::{Direction, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct TrendFollowParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub atr_period: usize,
    pub risk_fraction: f64,
    pub stop_multiple: f64,
}

impl Default for TrendFollowParams {
    fn default() -> Self {
        TrendFollowParams {
            ema_fast: 50,
            ema_slow: 200,
            atr_period: 14,
            risk_fraction: 0.01,
            stop_multiple: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrendFollow {
    params: TrendFollowParams,
}

impl TrendFollow {
    pub fn new(params: TrendFollowParams) -> Self {
        TrendFollow { params }
    }

    /// Higher-timeframe regime: `None` while warming up or when flat.
    pub fn regime(&self, higher: &[Bar]) -> Option<Direction> {
        let closes: Vec<f64> = higher.iter().map(|b| b.close).collect();
        let fast = calculate_ema(&closes, self.params.ema_fast).last().copied().flatten()?;
        let slow = calculate_ema(&closes, self.params.ema_slow).last().copied().flatten()?;

        if fast > slow {
            Some(Direction::Long)
        } else if fast < slow {
            Some(Direction::Short)
        } else {
            None
        }
    }

    pub fn on_new_bars(
        &self,
        symbol: &str,
        higher: &[Bar],
        lower: &[Bar],
        equity: f64,
    ) -> Option<Signal> {
        let direction = self.regime(higher)?;

        let atr = calculate_atr(lower, self.params.atr_period)?;
        if !atr.is_finite() || atr <= 0.0 {
            return None;
        }

        let last = lower.last()?;
        let entry_price = last.close;
        let stop_distance = atr * self.params.stop_multiple;
        let size = (equity * self.params.risk_fraction) / stop_distance;
        if !size.is_finite() || size <= 0.0 {
            return None;
        }

        let stop_loss = match direction {
            Direction::Long => entry_price - stop_distance,
            Direction::Short => entry_price + stop_distance,
        };

        tracing::debug!(
            symbol,
            fast = %IndicatorType::Ema(self.params.ema_fast),
            slow = %IndicatorType::Ema(self.params.ema_slow),
            %direction,
            atr,
            size,
            "trend-follow signal"
        );

        Some(Signal {
            symbol: symbol.to_string(),
            direction,
            entry_price,
            stop_loss,
            size,
            time: last.open_time,
        })
    }
}
