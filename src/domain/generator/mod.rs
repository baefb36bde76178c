//! Signal generators.
//!
//! Simple generators implement [`PriceStrategy`]: one finalized close in,
//! an optional [`Intent`] out. [`TrendFollow`] needs two timeframes and the
//! current equity, and answers with a fully sized [`Signal`].
//!
//! [`Signal`]: crate::domain::signal::Signal

pub mod composite;
pub mod ma_crossover;
pub mod rsi_threshold;
pub mod trend_follow;

use crate::domain::signal::Intent;

pub use composite::Composite;
pub use ma_crossover::MaCrossover;
pub use rsi_threshold::RsiThreshold;
pub use trend_follow::{TrendFollow, TrendFollowParams};

/// A stateful generator fed one closing price at a time.
pub trait PriceStrategy: Send {
    fn on_new_price(&mut self, price: f64) -> Option<Intent>;

    /// Short label for logs, e.g. `MA(SMA(5),SMA(20))`.
    fn describe(&self) -> String;
}
