//! Audit records appended for every account event.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use super::signal::Direction;

pub const TRADE_HEADER: [&str; 8] = [
    "time",
    "event",
    "symbol",
    "direction",
    "price",
    "size",
    "realized_pl",
    "cash_after",
];

pub const EQUITY_HEADER: [&str; 4] = ["time", "equity", "cash", "unrealized_pnl"];

pub const STOP_LOSS_REASON: &str = "stop_loss";
pub const SIGNAL_REASON: &str = "signal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeEvent {
    Open,
    Close(String),
    RejectInsufficientCash,
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeEvent::Open => write!(f, "open"),
            TradeEvent::Close(reason) => write!(f, "close_{}", reason),
            TradeEvent::RejectInsufficientCash => write!(f, "reject_insufficient_cash"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub time: DateTime<Utc>,
    pub event: TradeEvent,
    pub symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub size: f64,
    pub realized_pnl: f64,
    pub cash_after: f64,
}

impl TradeRecord {
    pub fn to_row(&self) -> [String; 8] {
        [
            format_time(self.time),
            self.event.to_string(),
            self.symbol.clone(),
            self.direction.to_string(),
            format_amount(self.price),
            format_amount(self.size),
            format_amount(self.realized_pnl),
            format_amount(self.cash_after),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
    pub time: DateTime<Utc>,
    pub equity: f64,
    pub cash: f64,
    pub unrealized_pnl: f64,
}

impl EquitySnapshot {
    pub fn to_row(&self) -> [String; 4] {
        [
            format_time(self.time),
            format_amount(self.equity),
            format_amount(self.cash),
            format_amount(self.unrealized_pnl),
        ]
    }
}

/// RFC3339, UTC, whole seconds.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_amount(value: f64) -> String {
    format!("{:.8}", value)
}
