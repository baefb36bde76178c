//! In-memory audit log, for tests and embedding.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::audit::{EquitySnapshot, TradeRecord};
use crate::domain::error::PapertraderError;
use crate::ports::audit_port::AuditPort;

#[derive(Debug, Default)]
struct Inner {
    trades: Vec<TradeRecord>,
    equity: Vec<EquitySnapshot>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    inner: Mutex<Inner>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.lock().trades.clone()
    }

    pub fn equity_snapshots(&self) -> Vec<EquitySnapshot> {
        self.lock().equity.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn closed_error() -> PapertraderError {
    PapertraderError::Audit {
        reason: "audit log is closed".into(),
    }
}

impl AuditPort for InMemoryAuditLog {
    fn append_trade(&self, record: &TradeRecord) -> Result<(), PapertraderError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(closed_error());
        }
        inner.trades.push(record.clone());
        Ok(())
    }

    fn append_equity(&self, snapshot: &EquitySnapshot) -> Result<(), PapertraderError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(closed_error());
        }
        inner.equity.push(snapshot.clone());
        Ok(())
    }

    fn close(&self) -> Result<(), PapertraderError> {
        self.lock().closed = true;
        Ok(())
    }
}
