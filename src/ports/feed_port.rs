//! Market-data feed port.

use crate::domain::bar::MarketEvent;
use crate::domain::error::PapertraderError;

/// Source of decoded market events, yielded in delivery order.
pub trait FeedPort {
    /// `Ok(None)` once the feed is exhausted.
    fn next_event(&mut self) -> Result<Option<MarketEvent>, PapertraderError>;
}
