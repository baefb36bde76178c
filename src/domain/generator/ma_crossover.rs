//! Moving-average crossover.
//!
//! Level-triggered: while the short MA stays above the long MA every new
//! price yields `Buy` again. Deduplication is the account's job.

use std::collections::VecDeque;

use super::PriceStrategy;
use crate::domain::indicator::{moving_average, IndicatorType};
use crate::domain::signal::Intent;

#[derive(Debug, Clone)]
pub struct MaCrossover {
    short: usize,
    long: usize,
    prices: VecDeque<f64>,
}

impl MaCrossover {
    /// `short` must be in `1..=long`; the config layer enforces it.
    pub fn new(short: usize, long: usize) -> Self {
        MaCrossover {
            short,
            long,
            prices: VecDeque::with_capacity(long),
        }
    }
}

impl PriceStrategy for MaCrossover {
    fn on_new_price(&mut self, price: f64) -> Option<Intent> {
        self.prices.push_back(price);
        while self.prices.len() > self.long {
            self.prices.pop_front();
        }
        if self.prices.len() < self.long {
            return None;
        }

        let window = self.prices.make_contiguous();
        let short_ma = moving_average(window, self.short)?;
        let long_ma = moving_average(window, self.long)?;

        if short_ma > long_ma {
            Some(Intent::Buy)
        } else if short_ma < long_ma {
            Some(Intent::Sell)
        } else {
            None
        }
    }

    fn describe(&self) -> String {
        format!(
            "MA({},{})",
            IndicatorType::Sma(self.short),
            IndicatorType::Sma(self.long)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_while_filling() {
        let mut ma = MaCrossover::new(2, 4);
        assert_eq!(ma.on_new_price(1.0), None);
        assert_eq!(ma.on_new_price(2.0), None);
        assert_eq!(ma.on_new_price(3.0), None);
        assert_eq!(ma.on_new_price(4.0), Some(Intent::Buy));
    }

    #[test]
    fn rising_buys_falling_sells() {
        let mut ma = MaCrossover::new(2, 4);
        for p in [1.0, 2.0, 3.0] {
            ma.on_new_price(p);
        }
        assert_eq!(ma.on_new_price(4.0), Some(Intent::Buy));

        let mut ma = MaCrossover::new(2, 4);
        for p in [4.0, 3.0, 2.0] {
            ma.on_new_price(p);
        }
        assert_eq!(ma.on_new_price(1.0), Some(Intent::Sell));
    }

    #[test]
    fn equal_averages_are_silent() {
        let mut ma = MaCrossover::new(2, 4);
        for p in [5.0, 5.0, 5.0] {
            ma.on_new_price(p);
        }
        assert_eq!(ma.on_new_price(5.0), None);
    }

    #[test]
    fn re_emits_while_condition_holds() {
        let mut ma = MaCrossover::new(2, 4);
        for p in [1.0, 2.0, 3.0] {
            ma.on_new_price(p);
        }
        assert_eq!(ma.on_new_price(4.0), Some(Intent::Buy));
        assert_eq!(ma.on_new_price(5.0), Some(Intent::Buy));
        assert_eq!(ma.on_new_price(6.0), Some(Intent::Buy));
    }

    #[test]
    fn buffer_is_bounded() {
        let mut ma = MaCrossover::new(2, 4);
        for p in 0..100 {
            ma.on_new_price(p as f64);
        }
        assert_eq!(ma.prices.len(), 4);
        // an old spike has rolled out of the window
        let mut ma = MaCrossover::new(1, 3);
        for p in [1000.0, 1.0, 2.0] {
            ma.on_new_price(p);
        }
        assert_eq!(ma.on_new_price(3.0), Some(Intent::Buy));
    }

    #[test]
    fn describe_names_periods() {
        assert_eq!(MaCrossover::new(5, 20).describe(), "MA(SMA(5),SMA(20))");
    }
}
