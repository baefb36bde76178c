//! Trading session: routes market events to the account and the generators.
//!
//! Every bar, closed or not, is a price tick for stop-loss purposes. Only
//! closed bars on the signal interval reach a generator. [`run_pipeline`]
//! feeds a session from a [`FeedPort`] through a bounded queue, one producer
//! thread and one consumer, in delivery order.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::domain::audit::SIGNAL_REASON;
use crate::domain::bar::{Bar, MarketEvent};
use crate::domain::config::{IntentSizing, SessionConfig, StrategyKind};
use crate::domain::engine::{AccountEngine, ExecutionOutcome};
use crate::domain::error::PapertraderError;
use crate::domain::generator::TrendFollow;
use crate::domain::position::ClosedPosition;
use crate::domain::registry::StrategyRegistry;
use crate::domain::signal::{Direction, Intent, Signal};
use crate::ports::feed_port::FeedPort;

/// What a single event did to the account.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventReport {
    /// Positions closed by their stop on this tick.
    pub stopped: Vec<ClosedPosition>,
    /// Position closed by an opposite generator intent.
    pub exited: Option<ClosedPosition>,
    /// Result of an entry attempt, if a generator asked for one.
    pub execution: Option<ExecutionOutcome>,
}

struct TrendState {
    strategy: TrendFollow,
    trend_interval: String,
    capacity: usize,
    symbols: Vec<String>,
    bars: HashMap<(String, String), VecDeque<Bar>>,
}

impl TrendState {
    fn push(&mut self, bar: &Bar) {
        let history = self
            .bars
            .entry((bar.symbol.clone(), bar.interval.clone()))
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        history.push_back(bar.clone());
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    fn evaluate(&mut self, symbol: &str, signal_interval: &str, equity: f64) -> Option<Signal> {
        let higher_key = (symbol.to_string(), self.trend_interval.clone());
        let lower_key = (symbol.to_string(), signal_interval.to_string());
        for key in [&higher_key, &lower_key] {
            if let Some(history) = self.bars.get_mut(key) {
                history.make_contiguous();
            }
        }
        let higher = self.bars.get(&higher_key).map(|h| h.as_slices().0)?;
        let lower = self.bars.get(&lower_key).map(|h| h.as_slices().0)?;
        self.strategy.on_new_bars(symbol, higher, lower, equity)
    }
}

pub struct TradingSession {
    engine: Arc<AccountEngine>,
    registry: StrategyRegistry,
    trend: Option<TrendState>,
    sizing: IntentSizing,
    allow_shorting: bool,
    signal_interval: String,
}

impl TradingSession {
    pub fn new(
        engine: Arc<AccountEngine>,
        registry: StrategyRegistry,
        config: &SessionConfig,
    ) -> Self {
        let trend = (config.strategy.kind == StrategyKind::TrendFollow).then(|| TrendState {
            strategy: TrendFollow::new(config.trend.params.clone()),
            trend_interval: config.market.trend_interval.clone(),
            capacity: config.trend.history,
            symbols: config.market.symbols.clone(),
            bars: HashMap::new(),
        });
        TradingSession {
            engine,
            registry,
            trend,
            sizing: config.strategy.sizing,
            allow_shorting: config.strategy.allow_shorting,
            signal_interval: config.market.signal_interval.clone(),
        }
    }

    /// Session with a registry built from the same configuration.
    pub fn from_config(engine: Arc<AccountEngine>, config: &SessionConfig) -> Self {
        Self::new(engine, StrategyRegistry::from_config(config), config)
    }

    pub fn engine(&self) -> &Arc<AccountEngine> {
        &self.engine
    }

    pub fn apply(&mut self, event: &MarketEvent) -> EventReport {
        let MarketEvent::Bar(bar) = event;
        let mut report = EventReport {
            stopped: self.engine.on_price_update(&bar.symbol, bar.close),
            ..EventReport::default()
        };
        if !bar.closed {
            return report;
        }

        if let Some(trend) = self.trend.as_mut() {
            if !trend.symbols.contains(&bar.symbol) {
                return report;
            }
            let is_signal_bar = bar.interval == self.signal_interval;
            if is_signal_bar || bar.interval == trend.trend_interval {
                trend.push(bar);
            }
            if is_signal_bar {
                let equity = self.engine.get_equity();
                if let Some(signal) = trend.evaluate(&bar.symbol, &self.signal_interval, equity) {
                    report.execution = self.enter(&signal);
                }
            }
            return report;
        }

        if bar.interval != self.signal_interval {
            return report;
        }
        let Some(strategy) = self.registry.get_mut(&bar.symbol, &bar.interval) else {
            return report;
        };
        let Some(intent) = strategy.on_new_price(bar.close) else {
            return report;
        };
        tracing::debug!(symbol = %bar.symbol, %intent, price = bar.close, "generator intent");
        self.on_intent(bar, intent, &mut report);
        report
    }

    fn on_intent(&self, bar: &Bar, intent: Intent, report: &mut EventReport) {
        let direction = intent.direction();
        if let Some(open) = self.engine.position(&bar.symbol) {
            if open.direction == direction.opposite() {
                report.exited = self
                    .engine
                    .close_position(&bar.symbol, bar.close, SIGNAL_REASON);
                return;
            }
        }
        let signal = self
            .sizing
            .signal(&bar.symbol, direction, bar.close, bar.open_time);
        report.execution = self.enter(&signal);
    }

    fn enter(&self, signal: &Signal) -> Option<ExecutionOutcome> {
        if signal.direction == Direction::Short && !self.allow_shorting {
            tracing::debug!(symbol = %signal.symbol, "short entry skipped, shorting disabled");
            return None;
        }
        Some(self.engine.execute(signal))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub events: u64,
}

/// Drains `feed` into `session` through a queue of `capacity` events.
///
/// Events read before a feed error are still applied; the error is returned
/// once the queue is empty.
pub fn run_pipeline<F>(
    feed: F,
    session: &mut TradingSession,
    capacity: usize,
) -> Result<PipelineStats, PapertraderError>
where
    F: FeedPort + Send,
{
    let (tx, rx) = mpsc::sync_channel::<MarketEvent>(capacity);
    tracing::info!(capacity, "pipeline started");

    thread::scope(|s| {
        let producer = s.spawn(move || {
            let mut feed = feed;
            while let Some(event) = feed.next_event()? {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Ok::<(), PapertraderError>(())
        });

        let mut events = 0u64;
        for event in rx {
            session.apply(&event);
            events += 1;
        }

        producer.join().map_err(|_| PapertraderError::Feed {
            line: 0,
            reason: "feed thread panicked".into(),
        })??;

        tracing::info!(events, "pipeline finished");
        Ok(PipelineStats { events })
    })
}
