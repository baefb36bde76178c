//! Average True Range.
//!
//! Simple mean of the last `period` true ranges. Needs `period + 1` bars
//! because every true range looks at the previous close.

use crate::domain::bar::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let window = &bars[bars.len() - (period + 1)..];
    let sum: f64 = window
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .sum();
    Some(sum / period as f64)
}
