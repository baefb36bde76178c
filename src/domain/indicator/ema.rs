//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the SMA of the first n values, then
//! EMA[i] = EMA[i-1] + (x[i] - EMA[i-1]) * k.
//! Warmup: the first (n-1) positions carry no value.

use std::collections::VecDeque;

/// Batch EMA over `values`. Positions before `period - 1` are `None`.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return Vec::new();
    }

    let mut ema = Ema::new(period);
    values.iter().map(|&x| ema.update(x)).collect()
}

/// Incremental EMA for streaming closes.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seed: VecDeque<f64>,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed: VecDeque::with_capacity(period),
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        match self.value {
            Some(prev) => {
                self.value = Some(prev + (x - prev) * self.k);
            }
            None => {
                self.seed.push_back(x);
                if self.seed.len() == self.period {
                    let sma = self.seed.iter().sum::<f64>() / self.period as f64;
                    self.seed.clear();
                    self.value = Some(sma);
                }
            }
        }
        self.value
    }
}
