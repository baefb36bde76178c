//! Append-only audit log port.

use crate::domain::audit::{EquitySnapshot, TradeRecord};
use crate::domain::error::PapertraderError;

/// Durable, append-only sink for account events.
///
/// Implementations guard their own writers; the engine calls them while it
/// holds the account lock, so appends arrive in mutation order.
pub trait AuditPort: Send + Sync {
    fn append_trade(&self, record: &TradeRecord) -> Result<(), PapertraderError>;

    fn append_equity(&self, snapshot: &EquitySnapshot) -> Result<(), PapertraderError>;

    /// Flush and release underlying resources. Appends after `close` fail.
    fn close(&self) -> Result<(), PapertraderError>;
}
