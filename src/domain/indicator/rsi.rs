//! RSI (Relative Strength Index), incremental.
//!
//! Uses Wilder's smoothing for average gain/loss:
//! - First average: simple mean of the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Seeding: n changes (n+1 prices) build the first averages and produce no
//! value; the first RSI is reported on the following price.

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    seed_count: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
    seeded: bool,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Rsi {
            period,
            prev_close: None,
            seed_count: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            seeded: false,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        let prev = self.prev_close.replace(price)?;
        let change = price - prev;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        if !self.seeded {
            self.gain_sum += gain;
            self.loss_sum += loss;
            self.seed_count += 1;
            if self.seed_count == self.period {
                self.avg_gain = self.gain_sum / self.period as f64;
                self.avg_loss = self.loss_sum / self.period as f64;
                self.seeded = true;
            }
            return None;
        }

        let n = self.period as f64;
        self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
        self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;

        Some(self.value())
    }

    fn value(&self) -> f64 {
        if self.avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + self.avg_gain / self.avg_loss))
        }
    }
}
