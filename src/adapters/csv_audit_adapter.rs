//! CSV audit log: `trades.csv` and `equity.csv`, append-only.
//!
//! Files are opened in append mode; the header row is written only when a
//! file starts out empty, so restarts keep extending the same history. Every
//! row is flushed as soon as it is written.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::audit::{EquitySnapshot, TradeRecord, EQUITY_HEADER, TRADE_HEADER};
use crate::domain::error::PapertraderError;
use crate::ports::audit_port::AuditPort;

pub struct CsvAuditAdapter {
    trades_path: PathBuf,
    equity_path: PathBuf,
    trades: Mutex<Option<csv::Writer<File>>>,
    equity: Mutex<Option<csv::Writer<File>>>,
}

impl CsvAuditAdapter {
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        trades_path: P,
        equity_path: Q,
    ) -> Result<Self, PapertraderError> {
        let trades_path = trades_path.as_ref().to_path_buf();
        let equity_path = equity_path.as_ref().to_path_buf();
        let trades = open_log(&trades_path, &TRADE_HEADER)?;
        let equity = open_log(&equity_path, &EQUITY_HEADER)?;
        tracing::info!(
            trades = %trades_path.display(),
            equity = %equity_path.display(),
            "audit log opened"
        );
        Ok(Self {
            trades_path,
            equity_path,
            trades: Mutex::new(Some(trades)),
            equity: Mutex::new(Some(equity)),
        })
    }
}

fn open_log(path: &Path, header: &[&str]) -> Result<csv::Writer<File>, PapertraderError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PapertraderError::Audit {
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        writer.write_record(header)?;
        writer.flush()?;
    }
    Ok(writer)
}

fn lock_writer(
    writer: &Mutex<Option<csv::Writer<File>>>,
) -> MutexGuard<'_, Option<csv::Writer<File>>> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn append_row<I, T>(
    writer: &Mutex<Option<csv::Writer<File>>>,
    path: &Path,
    row: I,
) -> Result<(), PapertraderError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut guard = lock_writer(writer);
    let writer = guard.as_mut().ok_or_else(|| PapertraderError::Audit {
        reason: format!("{} is closed", path.display()),
    })?;
    writer
        .write_record(row)
        .and_then(|_| writer.flush().map_err(csv::Error::from))
        .map_err(|e| PapertraderError::Audit {
            reason: format!("failed to write {}: {}", path.display(), e),
        })
}

impl AuditPort for CsvAuditAdapter {
    fn append_trade(&self, record: &TradeRecord) -> Result<(), PapertraderError> {
        append_row(&self.trades, &self.trades_path, record.to_row())
    }

    fn append_equity(&self, snapshot: &EquitySnapshot) -> Result<(), PapertraderError> {
        append_row(&self.equity, &self.equity_path, snapshot.to_row())
    }

    fn close(&self) -> Result<(), PapertraderError> {
        for writer in [&self.trades, &self.equity] {
            if let Some(mut w) = lock_writer(writer).take() {
                w.flush()?;
            }
        }
        tracing::info!("audit log closed");
        Ok(())
    }
}
