//! Session configuration: validation and typed build.
//!
//! Reads every section through [`ConfigPort`], applies defaults and rejects
//! values the engine or generators cannot work with.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::domain::error::PapertraderError;
use crate::domain::generator::TrendFollowParams;
use crate::domain::signal::{Direction, Signal};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TRADES_PATH: &str = "trades.csv";
pub const DEFAULT_EQUITY_PATH: &str = "equity.csv";
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_SIGNAL_INTERVAL: &str = "15m";
pub const DEFAULT_TREND_INTERVAL: &str = "4h";
pub const DEFAULT_TREND_HISTORY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    MaCross,
    Rsi,
    Composite,
    TrendFollow,
}

impl StrategyKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ma_cross" => Some(StrategyKind::MaCross),
            "rsi" => Some(StrategyKind::Rsi),
            "composite" => Some(StrategyKind::Composite),
            "trend_follow" => Some(StrategyKind::TrendFollow),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::MaCross => "ma_cross",
            StrategyKind::Rsi => "rsi",
            StrategyKind::Composite => "composite",
            StrategyKind::TrendFollow => "trend_follow",
        };
        write!(f, "{}", name)
    }
}

/// Turns a bare intent into a sized signal: fixed order size and a stop
/// placed a percentage away from the entry. A zero percentage means no stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentSizing {
    pub order_size: f64,
    pub stop_loss_pct: f64,
}

impl IntentSizing {
    pub fn signal(
        &self,
        symbol: &str,
        direction: Direction,
        price: f64,
        time: DateTime<Utc>,
    ) -> Signal {
        let stop_loss = if self.stop_loss_pct > 0.0 {
            let offset = price * self.stop_loss_pct / 100.0;
            match direction {
                Direction::Long => price - offset,
                Direction::Short => price + offset,
            }
        } else {
            0.0
        };
        Signal {
            symbol: symbol.to_string(),
            direction,
            entry_price: price,
            stop_loss,
            size: self.order_size,
            time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    pub trades_path: PathBuf,
    pub equity_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    pub symbols: Vec<String>,
    pub signal_interval: String,
    pub trend_interval: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Composite members in evaluation order.
    pub members: Vec<StrategyKind>,
    pub ma_short: usize,
    pub ma_long: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub sizing: IntentSizing,
    pub allow_shorting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    pub params: TrendFollowParams,
    /// Closed bars kept per (symbol, interval).
    pub history: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub initial_equity: f64,
    pub audit: AuditConfig,
    pub queue_capacity: usize,
    pub market: MarketConfig,
    pub strategy: StrategyConfig,
    pub trend: TrendConfig,
}

impl SessionConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, PapertraderError> {
        let initial_equity = validate_initial_equity(config)?;
        let audit = build_audit(config);
        let queue_capacity =
            positive_usize(config, "feed", "queue_capacity", DEFAULT_QUEUE_CAPACITY)?;
        let market = build_market(config)?;
        let strategy = build_strategy(config)?;
        let trend = build_trend(config)?;

        if strategy.kind == StrategyKind::TrendFollow
            && market.signal_interval == market.trend_interval
        {
            return Err(PapertraderError::invalid(
                "market",
                "trend_interval",
                "trend_interval must differ from signal_interval",
            ));
        }

        Ok(SessionConfig {
            initial_equity,
            audit,
            queue_capacity,
            market,
            strategy,
            trend,
        })
    }
}

fn validate_initial_equity(config: &dyn ConfigPort) -> Result<f64, PapertraderError> {
    if config.get_string("account", "initial_equity").is_none() {
        return Err(PapertraderError::missing("account", "initial_equity"));
    }
    let value = number(config, "account", "initial_equity", 0.0)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(PapertraderError::invalid(
            "account",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }
    Ok(value)
}

fn build_audit(config: &dyn ConfigPort) -> AuditConfig {
    let path = |key: &str, default: &str| -> PathBuf {
        config
            .get_string("audit", key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string())
            .into()
    };
    AuditConfig {
        trades_path: path("trades_path", DEFAULT_TRADES_PATH),
        equity_path: path("equity_path", DEFAULT_EQUITY_PATH),
    }
}

fn build_market(config: &dyn ConfigPort) -> Result<MarketConfig, PapertraderError> {
    let raw = config
        .get_string("market", "symbols")
        .ok_or_else(|| PapertraderError::missing("market", "symbols"))?;
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        return Err(PapertraderError::invalid(
            "market",
            "symbols",
            "at least one symbol is required",
        ));
    }

    Ok(MarketConfig {
        symbols,
        signal_interval: interval(config, "signal_interval", DEFAULT_SIGNAL_INTERVAL)?,
        trend_interval: interval(config, "trend_interval", DEFAULT_TREND_INTERVAL)?,
    })
}

fn interval(config: &dyn ConfigPort, key: &str, default: &str) -> Result<String, PapertraderError> {
    match config.get_string("market", key) {
        None => Ok(default.to_string()),
        Some(s) if s.trim().is_empty() => Err(PapertraderError::invalid(
            "market",
            key,
            format!("{} must not be empty", key),
        )),
        Some(s) => Ok(s.trim().to_string()),
    }
}

fn parse_kind(value: &str, key: &str) -> Result<StrategyKind, PapertraderError> {
    StrategyKind::parse(value).ok_or_else(|| {
        PapertraderError::invalid(
            "strategy",
            key,
            format!(
                "unknown strategy '{}', expected ma_cross, rsi, composite or trend_follow",
                value.trim()
            ),
        )
    })
}

fn build_strategy(config: &dyn ConfigPort) -> Result<StrategyConfig, PapertraderError> {
    let kind = match config.get_string("strategy", "kind") {
        Some(s) => parse_kind(&s, "kind")?,
        None => StrategyKind::Composite,
    };

    let members_raw = config
        .get_string("strategy", "members")
        .unwrap_or_else(|| "rsi,ma_cross".to_string());
    let members = members_raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_kind(s, "members"))
        .collect::<Result<Vec<_>, _>>()?;
    if kind == StrategyKind::Composite {
        if members.is_empty() {
            return Err(PapertraderError::invalid(
                "strategy",
                "members",
                "composite needs at least one member",
            ));
        }
        if let Some(bad) = members
            .iter()
            .find(|m| !matches!(m, StrategyKind::MaCross | StrategyKind::Rsi))
        {
            return Err(PapertraderError::invalid(
                "strategy",
                "members",
                format!("{} cannot be a composite member", bad),
            ));
        }
    }

    let ma_short = positive_usize(config, "strategy", "ma_short", 5)?;
    let ma_long = positive_usize(config, "strategy", "ma_long", 20)?;
    if ma_short >= ma_long {
        return Err(PapertraderError::invalid(
            "strategy",
            "ma_short",
            "ma_short must be less than ma_long",
        ));
    }

    let rsi_period = positive_usize(config, "strategy", "rsi_period", 14)?;
    let rsi_oversold = number(config, "strategy", "rsi_oversold", 30.0)?;
    let rsi_overbought = number(config, "strategy", "rsi_overbought", 70.0)?;
    for (key, value) in [("rsi_oversold", rsi_oversold), ("rsi_overbought", rsi_overbought)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(PapertraderError::invalid(
                "strategy",
                key,
                format!("{} must be between 0 and 100", key),
            ));
        }
    }
    if rsi_oversold >= rsi_overbought {
        return Err(PapertraderError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }

    let order_size = number(config, "strategy", "order_size", 1.0)?;
    if !order_size.is_finite() || order_size <= 0.0 {
        return Err(PapertraderError::invalid(
            "strategy",
            "order_size",
            "order_size must be positive",
        ));
    }
    let stop_loss_pct = number(config, "strategy", "stop_loss_pct", 0.0)?;
    if !(0.0..100.0).contains(&stop_loss_pct) {
        return Err(PapertraderError::invalid(
            "strategy",
            "stop_loss_pct",
            "stop_loss_pct must be in [0, 100)",
        ));
    }

    Ok(StrategyConfig {
        kind,
        members,
        ma_short,
        ma_long,
        rsi_period,
        rsi_oversold,
        rsi_overbought,
        sizing: IntentSizing {
            order_size,
            stop_loss_pct,
        },
        allow_shorting: config.get_bool("strategy", "allow_shorting", false),
    })
}

fn build_trend(config: &dyn ConfigPort) -> Result<TrendConfig, PapertraderError> {
    let defaults = TrendFollowParams::default();
    let ema_fast = positive_usize(config, "trend", "ema_fast", defaults.ema_fast)?;
    let ema_slow = positive_usize(config, "trend", "ema_slow", defaults.ema_slow)?;
    if ema_fast >= ema_slow {
        return Err(PapertraderError::invalid(
            "trend",
            "ema_fast",
            "ema_fast must be less than ema_slow",
        ));
    }
    let atr_period = positive_usize(config, "trend", "atr_period", defaults.atr_period)?;

    let risk_fraction = number(config, "trend", "risk_fraction", defaults.risk_fraction)?;
    if !(risk_fraction > 0.0 && risk_fraction <= 1.0) {
        return Err(PapertraderError::invalid(
            "trend",
            "risk_fraction",
            "risk_fraction must be in (0, 1]",
        ));
    }
    let stop_multiple = number(config, "trend", "stop_multiple", defaults.stop_multiple)?;
    if !stop_multiple.is_finite() || stop_multiple <= 0.0 {
        return Err(PapertraderError::invalid(
            "trend",
            "stop_multiple",
            "stop_multiple must be positive",
        ));
    }

    let history = positive_usize(config, "trend", "history", DEFAULT_TREND_HISTORY)?;
    if history < ema_slow || history <= atr_period {
        return Err(PapertraderError::invalid(
            "trend",
            "history",
            "history must cover ema_slow and atr_period + 1 bars",
        ));
    }

    Ok(TrendConfig {
        params: TrendFollowParams {
            ema_fast,
            ema_slow,
            atr_period,
            risk_fraction,
            stop_multiple,
        },
        history,
    })
}

fn number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, PapertraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<f64>()
        .map_err(|_| PapertraderError::invalid(section, key, format!("{} must be a number", key)))
}

fn positive_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, PapertraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(PapertraderError::invalid(
            section,
            key,
            format!("{} must be a positive integer", key),
        )),
    }
}
