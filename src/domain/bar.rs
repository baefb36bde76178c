//! Price bar (candlestick) and the market events that carry it.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub interval: String,
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Whether the interval has finalized. Open bars still move prices and
    /// trigger stops but never feed signal generators.
    pub closed: bool,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// An already-decoded event from the upstream market-data transport.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    Bar(Bar),
}
