//! CSV market-data feed.
//!
//! Columns: `symbol,interval,open_time,open,high,low,close,volume,closed`.
//! `open_time` is RFC3339 or epoch milliseconds; `closed` is `true/false`
//! (or `1/0`). Symbols are uppercased to match configured symbols. Rows are
//! yielded in file order: the file is the delivery order and is never sorted.

use chrono::{DateTime, TimeZone, Utc};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::bar::{Bar, MarketEvent};
use crate::domain::error::PapertraderError;
use crate::ports::feed_port::FeedPort;

pub struct CsvFeedAdapter<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
}

impl CsvFeedAdapter<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PapertraderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PapertraderError::Feed {
            line: 0,
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CsvFeedAdapter<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader),
            record: csv::StringRecord::new(),
        }
    }
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<&'a str, PapertraderError> {
    record.get(index).ok_or_else(|| PapertraderError::Feed {
        line,
        reason: format!("missing {} column", name),
    })
}

fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, PapertraderError> {
    let value: f64 = field(record, index, name, line)?
        .parse()
        .map_err(|e| PapertraderError::Feed {
            line,
            reason: format!("invalid {} value: {}", name, e),
        })?;
    if !value.is_finite() || value < 0.0 {
        return Err(PapertraderError::Feed {
            line,
            reason: format!("{} must be a non-negative number", name),
        });
    }
    Ok(value)
}

fn parse_time(value: &str, line: u64) -> Result<DateTime<Utc>, PapertraderError> {
    if let Ok(millis) = value.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| PapertraderError::Feed {
                line,
                reason: format!("open_time out of range: {}", millis),
            });
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PapertraderError::Feed {
            line,
            reason: format!("invalid open_time: {}", e),
        })
}

fn parse_closed(value: &str, line: u64) -> Result<bool, PapertraderError> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(PapertraderError::Feed {
            line,
            reason: format!("invalid closed flag: {}", other),
        }),
    }
}

fn parse_bar(record: &csv::StringRecord, line: u64) -> Result<Bar, PapertraderError> {
    let symbol = field(record, 0, "symbol", line)?;
    if symbol.is_empty() {
        return Err(PapertraderError::Feed {
            line,
            reason: "empty symbol".into(),
        });
    }
    let interval = field(record, 1, "interval", line)?;
    let open_time = parse_time(field(record, 2, "open_time", line)?, line)?;
    let open = parse_price(record, 3, "open", line)?;
    let high = parse_price(record, 4, "high", line)?;
    let low = parse_price(record, 5, "low", line)?;
    let close = parse_price(record, 6, "close", line)?;
    let volume = parse_price(record, 7, "volume", line)?;
    let closed = parse_closed(field(record, 8, "closed", line)?, line)?;

    if close <= 0.0 {
        return Err(PapertraderError::Feed {
            line,
            reason: "close must be positive".into(),
        });
    }

    Ok(Bar {
        symbol: symbol.to_ascii_uppercase(),
        interval: interval.to_string(),
        open_time,
        open,
        high,
        low,
        close,
        volume,
        closed,
    })
}

impl<R: Read> FeedPort for CsvFeedAdapter<R> {
    fn next_event(&mut self) -> Result<Option<MarketEvent>, PapertraderError> {
        let has_row = self.reader.read_record(&mut self.record).map_err(|e| {
            PapertraderError::Feed {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                reason: format!("CSV parse error: {}", e),
            }
        })?;
        if !has_row {
            return Ok(None);
        }
        let line = self.record.position().map(|p| p.line()).unwrap_or(0);
        parse_bar(&self.record, line).map(|bar| Some(MarketEvent::Bar(bar)))
    }
}
