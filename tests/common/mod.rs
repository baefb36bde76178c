#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use papertrader::adapters::memory_audit_adapter::InMemoryAuditLog;
pub use papertrader::domain::bar::Bar;
use papertrader::domain::engine::AccountEngine;
use papertrader::domain::signal::{Direction, Signal};
use std::io::Write;
use std::sync::Arc;

pub const FEED_HEADER: &str = "symbol,interval,open_time,open,high,low,close,volume,closed\n";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

pub fn engine_with_log(initial_equity: f64) -> (Arc<AccountEngine>, Arc<InMemoryAuditLog>) {
    let log = Arc::new(InMemoryAuditLog::new());
    let engine = AccountEngine::with_clock(initial_equity, log.clone(), t0).unwrap();
    (Arc::new(engine), log)
}

pub fn signal(symbol: &str, direction: Direction, entry: f64, size: f64, stop: f64) -> Signal {
    Signal {
        symbol: symbol.to_string(),
        direction,
        entry_price: entry,
        stop_loss: stop,
        size,
        time: t0(),
    }
}

pub fn make_bar(symbol: &str, interval: &str, index: i64, close: f64, closed: bool) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        open_time: t0() + Duration::minutes(15 * index),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
        closed,
    }
}

/// One feed CSV row for a flat bar.
pub fn feed_row(symbol: &str, interval: &str, index: i64, close: f64, closed: bool) -> String {
    let bar = make_bar(symbol, interval, index, close, closed);
    format!(
        "{},{},{},{},{},{},{},{},{}\n",
        bar.symbol,
        bar.interval,
        bar.open_time.timestamp_millis(),
        bar.open,
        bar.high,
        bar.low,
        bar.close,
        bar.volume,
        bar.closed
    )
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
