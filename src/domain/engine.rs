//! Simulated account engine.
//!
//! One `Mutex` guards cash, positions and last prices. `execute`,
//! `on_price_update`, `close_position`, `get_equity` and `snapshot` all take
//! it, so no caller can observe a half-applied event. Audit appends happen
//! while the lock is held, which keeps the audit log in mutation order.
//!
//! Cash model: an open debits `entry_price * size` and a close credits
//! `exit_price * size`, in either direction. Realized P&L is reported in the
//! trade record and never applied to cash a second time. Equity is cash plus
//! every open position at its last price (entry price before the first tick),
//! so neither an open nor a close moves equity.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::account::AccountState;
use super::audit::{EquitySnapshot, TradeEvent, TradeRecord, STOP_LOSS_REASON};
use super::error::PapertraderError;
use super::position::{ClosedPosition, Position};
use super::signal::Signal;
use crate::ports::audit_port::AuditPort;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What `execute` did with a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Opened,
    /// A position for the symbol is already open; nothing was recorded.
    Ignored,
    /// Not enough cash; a rejection record was appended.
    Rejected { required: f64, available: f64 },
}

pub struct AccountEngine {
    state: Mutex<AccountState>,
    audit: Arc<dyn AuditPort>,
    clock: Clock,
    audit_failures: AtomicU64,
}

impl AccountEngine {
    pub fn new(initial_equity: f64, audit: Arc<dyn AuditPort>) -> Result<Self, PapertraderError> {
        Self::with_clock(initial_equity, audit, Utc::now)
    }

    /// Like [`AccountEngine::new`] with an injected time source for records.
    pub fn with_clock<F>(
        initial_equity: f64,
        audit: Arc<dyn AuditPort>,
        clock: F,
    ) -> Result<Self, PapertraderError>
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        if !initial_equity.is_finite() || initial_equity <= 0.0 {
            return Err(PapertraderError::InvalidInitialEquity {
                value: initial_equity,
            });
        }
        Ok(AccountEngine {
            state: Mutex::new(AccountState::new(initial_equity)),
            audit,
            clock: Box::new(clock),
            audit_failures: AtomicU64::new(0),
        })
    }

    pub fn execute(&self, signal: &Signal) -> ExecutionOutcome {
        let mut state = self.lock();

        if state.has_position(&signal.symbol) {
            tracing::debug!(symbol = %signal.symbol, "position already open, signal ignored");
            return ExecutionOutcome::Ignored;
        }

        let required = signal.notional();
        if !state.can_afford(required) {
            let available = state.cash;
            self.write_trade(&TradeRecord {
                time: (self.clock)(),
                event: TradeEvent::RejectInsufficientCash,
                symbol: signal.symbol.clone(),
                direction: signal.direction,
                price: signal.entry_price,
                size: signal.size,
                realized_pnl: 0.0,
                cash_after: available,
            });
            tracing::warn!(
                symbol = %signal.symbol,
                required,
                available,
                "order rejected: insufficient cash"
            );
            return ExecutionOutcome::Rejected {
                required,
                available,
            };
        }

        state.cash -= required;
        state.add_position(Position {
            symbol: signal.symbol.clone(),
            size: signal.size,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            direction: signal.direction,
            opened_at: signal.time,
        });

        self.write_trade(&TradeRecord {
            time: (self.clock)(),
            event: TradeEvent::Open,
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            price: signal.entry_price,
            size: signal.size,
            realized_pnl: 0.0,
            cash_after: state.cash,
        });
        self.write_equity(&state);

        tracing::info!(
            symbol = %signal.symbol,
            direction = %signal.direction,
            size = signal.size,
            entry = signal.entry_price,
            stop = signal.stop_loss,
            cash = state.cash,
            "position opened"
        );
        ExecutionOutcome::Opened
    }

    /// Records the tick, runs stop-loss checks and appends one equity
    /// snapshot. Returns the positions closed by this tick.
    pub fn on_price_update(&self, symbol: &str, price: f64) -> Vec<ClosedPosition> {
        let mut state = self.lock();
        state.record_price(symbol, price);

        // Each position is judged on its own symbol's last price.
        let triggered: Vec<(String, f64)> = state
            .positions
            .values()
            .filter_map(|pos| {
                let last = state.last_price(&pos.symbol)?;
                pos.should_stop_loss(last).then(|| (pos.symbol.clone(), last))
            })
            .collect();

        let closed = triggered
            .into_iter()
            .filter_map(|(sym, exit)| {
                self.close_locked(&mut state, &sym, exit, STOP_LOSS_REASON)
            })
            .collect();

        self.write_equity(&state);
        closed
    }

    /// Closes an open position outside the stop-loss path, e.g. on a
    /// strategy exit. `price` also becomes the symbol's last-seen price.
    pub fn close_position(
        &self,
        symbol: &str,
        price: f64,
        reason: &str,
    ) -> Option<ClosedPosition> {
        let mut state = self.lock();
        state.record_price(symbol, price);
        let closed = self.close_locked(&mut state, symbol, price, reason)?;
        self.write_equity(&state);
        Some(closed)
    }

    pub fn get_equity(&self) -> f64 {
        self.lock().total_equity()
    }

    /// Copy of the open position for `symbol`, if any.
    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.lock().get_position(symbol).cloned()
    }

    /// Point-in-time copy of the account for reporting.
    pub fn snapshot(&self) -> AccountState {
        self.lock().clone()
    }

    /// Number of audit appends that failed since construction.
    pub fn audit_failures(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    /// Flush and release the audit sink. Call once at shutdown.
    pub fn close(&self) -> Result<(), PapertraderError> {
        let _state = self.lock();
        self.audit.close()
    }

    fn lock(&self) -> MutexGuard<'_, AccountState> {
        // State is never left half-mutated, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close_locked(
        &self,
        state: &mut AccountState,
        symbol: &str,
        exit_price: f64,
        reason: &str,
    ) -> Option<ClosedPosition> {
        let pos = state.remove_position(symbol)?;
        let realized_pnl = pos.unrealized_pnl(exit_price);
        state.cash += pos.notional(exit_price);

        let closed_at = (self.clock)();
        self.write_trade(&TradeRecord {
            time: closed_at,
            event: TradeEvent::Close(reason.to_string()),
            symbol: pos.symbol.clone(),
            direction: pos.direction,
            price: exit_price,
            size: pos.size,
            realized_pnl,
            cash_after: state.cash,
        });

        tracing::info!(
            symbol = %pos.symbol,
            reason,
            exit = exit_price,
            pnl = realized_pnl,
            cash = state.cash,
            "position closed"
        );

        Some(ClosedPosition {
            symbol: pos.symbol,
            direction: pos.direction,
            size: pos.size,
            entry_price: pos.entry_price,
            exit_price,
            opened_at: pos.opened_at,
            closed_at,
            realized_pnl,
            reason: reason.to_string(),
        })
    }

    fn write_trade(&self, record: &TradeRecord) {
        if let Err(e) = self.audit.append_trade(record) {
            self.audit_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                error = %e,
                event = %record.event,
                symbol = %record.symbol,
                "failed to append trade record"
            );
        }
    }

    fn write_equity(&self, state: &AccountState) {
        let unrealized_pnl = state.unrealized_pnl();
        let snapshot = EquitySnapshot {
            time: (self.clock)(),
            equity: state.total_equity(),
            cash: state.cash,
            unrealized_pnl,
        };
        if let Err(e) = self.audit.append_equity(&snapshot) {
            self.audit_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(error = %e, "failed to append equity snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_audit_adapter::InMemoryAuditLog;
    use crate::domain::signal::Direction;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn engine(initial: f64) -> (AccountEngine, Arc<InMemoryAuditLog>) {
        let log = Arc::new(InMemoryAuditLog::new());
        let engine = AccountEngine::with_clock(initial, log.clone(), fixed_time).unwrap();
        (engine, log)
    }

    fn signal(symbol: &str, direction: Direction, entry: f64, size: f64, stop: f64) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            direction,
            entry_price: entry,
            stop_loss: stop,
            size,
            time: fixed_time(),
        }
    }

    struct FailingAudit;

    impl AuditPort for FailingAudit {
        fn append_trade(&self, _record: &TradeRecord) -> Result<(), PapertraderError> {
            Err(PapertraderError::Audit {
                reason: "disk full".into(),
            })
        }

        fn append_equity(&self, _snapshot: &EquitySnapshot) -> Result<(), PapertraderError> {
            Err(PapertraderError::Audit {
                reason: "disk full".into(),
            })
        }

        fn close(&self) -> Result<(), PapertraderError> {
            Ok(())
        }
    }

    #[test]
    fn rejects_invalid_initial_equity() {
        let log: Arc<dyn AuditPort> = Arc::new(InMemoryAuditLog::new());
        assert!(AccountEngine::new(0.0, log.clone()).is_err());
        assert!(AccountEngine::new(-5.0, log.clone()).is_err());
        assert!(AccountEngine::new(f64::NAN, log.clone()).is_err());
        assert!(AccountEngine::new(1.0, log).is_ok());
    }

    #[test]
    fn new_engine_is_flat() {
        let (engine, log) = engine(1000.0);
        let snap = engine.snapshot();
        assert_eq!(snap.cash, 1000.0);
        assert_eq!(snap.initial_equity, 1000.0);
        assert!(snap.positions.is_empty());
        assert_eq!(engine.get_equity(), 1000.0);
        assert!(log.trades().is_empty());
    }

    #[test]
    fn open_debits_cash_and_records() {
        let (engine, log) = engine(1000.0);
        let outcome = engine.execute(&signal("BTCUSDT", Direction::Long, 100.0, 5.0, 90.0));

        assert_eq!(outcome, ExecutionOutcome::Opened);
        let snap = engine.snapshot();
        assert_eq!(snap.cash, 500.0);
        let pos = snap.get_position("BTCUSDT").unwrap();
        assert_eq!(pos.size, 5.0);
        assert_eq!(pos.stop_loss, 90.0);

        let trades = log.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].event, TradeEvent::Open);
        assert_eq!(trades[0].cash_after, 500.0);
        assert_eq!(log.equity_snapshots().len(), 1);
        assert_eq!(log.equity_snapshots()[0].equity, 1000.0);
    }

    #[test]
    fn second_signal_for_open_symbol_is_ignored() {
        let (engine, log) = engine(1000.0);
        engine.execute(&signal("BTCUSDT", Direction::Long, 100.0, 1.0, 90.0));
        let outcome = engine.execute(&signal("BTCUSDT", Direction::Short, 100.0, 1.0, 110.0));

        assert_eq!(outcome, ExecutionOutcome::Ignored);
        assert_eq!(engine.snapshot().position_count(), 1);
        assert_eq!(engine.snapshot().cash, 900.0);
        assert_eq!(log.trades().len(), 1);
        assert_eq!(log.equity_snapshots().len(), 1);
    }

    #[test]
    fn exact_cash_is_enough() {
        let (engine, _log) = engine(1000.0);
        let outcome = engine.execute(&signal("BTCUSDT", Direction::Long, 200.0, 5.0, 0.0));
        assert_eq!(outcome, ExecutionOutcome::Opened);
        assert_eq!(engine.snapshot().cash, 0.0);
    }

    #[test]
    fn insufficient_cash_rejects_without_mutation() {
        let (engine, log) = engine(1000.0);
        let outcome = engine.execute(&signal("BTCUSDT", Direction::Long, 120.0, 10.0, 100.0));

        assert_eq!(
            outcome,
            ExecutionOutcome::Rejected {
                required: 1200.0,
                available: 1000.0
            }
        );
        assert!(engine.snapshot().positions.is_empty());
        assert_eq!(engine.snapshot().cash, 1000.0);
        let trades = log.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].event, TradeEvent::RejectInsufficientCash);
        assert_eq!(trades[0].realized_pnl, 0.0);
        assert_eq!(trades[0].cash_after, 1000.0);
        assert!(log.equity_snapshots().is_empty());
    }

    #[test]
    fn tick_without_position_records_price_and_snapshot() {
        let (engine, log) = engine(1000.0);
        let closed = engine.on_price_update("ETHUSDT", 2000.0);
        assert!(closed.is_empty());
        assert_eq!(engine.snapshot().last_price("ETHUSDT"), Some(2000.0));
        assert_eq!(log.equity_snapshots().len(), 1);
        assert!(log.trades().is_empty());
    }

    #[test]
    fn long_stop_loss_closes_at_tick_price() {
        let (engine, log) = engine(1000.0);
        engine.execute(&signal("BTCUSDT", Direction::Long, 100.0, 5.0, 90.0));

        assert!(engine.on_price_update("BTCUSDT", 95.0).is_empty());
        let closed = engine.on_price_update("BTCUSDT", 90.0);

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].reason, STOP_LOSS_REASON);
        assert_eq!(closed[0].realized_pnl, -50.0);
        assert_eq!(engine.snapshot().cash, 950.0);
        assert_eq!(engine.get_equity(), 950.0);

        let trades = log.trades();
        assert_eq!(trades.last().unwrap().event.to_string(), "close_stop_loss");
        assert_eq!(trades.last().unwrap().cash_after, 950.0);
    }

    #[test]
    fn short_stop_loss_fires_on_rise() {
        let (engine, _log) = engine(1000.0);
        engine.execute(&signal("ETHUSDT", Direction::Short, 100.0, 2.0, 110.0));

        assert!(engine.on_price_update("ETHUSDT", 109.0).is_empty());
        let closed = engine.on_price_update("ETHUSDT", 111.0);

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].realized_pnl, -22.0);
        // 800 after the open, 111 * 2 back on the close
        assert_eq!(engine.snapshot().cash, 1022.0);
    }

    #[test]
    fn short_close_credits_exit_notional() {
        let (engine, log) = engine(1000.0);
        engine.execute(&signal("ETHUSDT", Direction::Short, 100.0, 2.0, 0.0));
        let closed = engine.close_position("ETHUSDT", 80.0, "signal").unwrap();

        // realized P&L is reported, not added to cash
        assert_eq!(closed.realized_pnl, 40.0);
        assert_eq!(engine.snapshot().cash, 960.0);
        let close = log.trades().pop().unwrap();
        assert_eq!(close.realized_pnl, 40.0);
        assert_eq!(close.cash_after, 960.0);
    }

    #[test]
    fn closing_does_not_move_equity() {
        let (engine, _log) = engine(1000.0);
        engine.execute(&signal("ETHUSDT", Direction::Short, 100.0, 10.0, 0.0));
        assert_eq!(engine.snapshot().cash, 0.0);

        engine.on_price_update("ETHUSDT", 300.0);
        assert_eq!(engine.get_equity(), 3000.0);
        let closed = engine.close_position("ETHUSDT", 300.0, "signal").unwrap();

        assert_eq!(closed.realized_pnl, -2000.0);
        assert_eq!(engine.snapshot().cash, 3000.0);
        assert_eq!(engine.get_equity(), 3000.0);
    }

    #[test]
    fn tick_for_one_symbol_leaves_others_alone() {
        let (engine, _log) = engine(10_000.0);
        engine.execute(&signal("BTCUSDT", Direction::Long, 100.0, 1.0, 90.0));
        engine.execute(&signal("ETHUSDT", Direction::Long, 10.0, 1.0, 9.0));

        // 50 would be below BTC's stop, but it is an ETH price
        let closed = engine.on_price_update("ETHUSDT", 50.0);
        assert!(closed.is_empty());
        assert_eq!(engine.snapshot().position_count(), 2);
    }

    #[test]
    fn round_trip_at_entry_restores_cash() {
        let (engine, _log) = engine(1000.0);
        engine.execute(&signal("BTCUSDT", Direction::Long, 123.45, 3.0, 0.0));
        let closed = engine.close_position("BTCUSDT", 123.45, "signal").unwrap();

        assert_eq!(closed.realized_pnl, 0.0);
        assert_eq!(engine.snapshot().cash, 1000.0);
    }

    #[test]
    fn close_position_when_flat_is_noop() {
        let (engine, log) = engine(1000.0);
        assert!(engine.close_position("BTCUSDT", 100.0, "signal").is_none());
        assert!(log.trades().is_empty());
        assert!(log.equity_snapshots().is_empty());
    }

    #[test]
    fn equity_tracks_unrealized_pnl() {
        let (engine, log) = engine(1000.0);
        engine.execute(&signal("BTCUSDT", Direction::Long, 100.0, 5.0, 50.0));
        engine.on_price_update("BTCUSDT", 110.0);

        assert_eq!(engine.get_equity(), 1050.0);
        let last = log.equity_snapshots().last().cloned().unwrap();
        assert_eq!(last.unrealized_pnl, 50.0);
        assert_eq!(last.cash, 500.0);
        assert_eq!(last.equity, 1050.0);
    }

    #[test]
    fn audit_failures_are_counted_not_fatal() {
        let engine = AccountEngine::new(1000.0, Arc::new(FailingAudit)).unwrap();
        assert_eq!(
            engine.execute(&signal("BTCUSDT", Direction::Long, 100.0, 5.0, 90.0)),
            ExecutionOutcome::Opened
        );
        // open record + equity snapshot
        assert_eq!(engine.audit_failures(), 2);
        assert_eq!(engine.snapshot().cash, 500.0);

        engine.on_price_update("BTCUSDT", 80.0);
        // close record + equity snapshot
        assert_eq!(engine.audit_failures(), 4);
        assert_eq!(engine.snapshot().cash, 900.0);
    }

    #[test]
    fn close_releases_audit_log() {
        let (engine, log) = engine(1000.0);
        engine.close().unwrap();
        assert!(log.is_closed());
        engine.on_price_update("BTCUSDT", 1.0);
        assert_eq!(engine.audit_failures(), 1);
    }

    #[test]
    fn concurrent_ticks_and_signals_keep_books_consistent() {
        let (engine, log) = engine(100_000.0);
        let engine = Arc::new(engine);

        std::thread::scope(|s| {
            for t in 0..4 {
                let engine = Arc::clone(&engine);
                s.spawn(move || {
                    let symbol = format!("SYM{}", t);
                    for i in 0..50 {
                        engine.execute(&signal(&symbol, Direction::Long, 100.0, 1.0, 95.0));
                        let price = if i % 2 == 0 { 94.0 } else { 101.0 };
                        engine.on_price_update(&symbol, price);
                    }
                });
            }
        });

        let snap = engine.snapshot();
        assert!(snap.cash >= 0.0);
        let opens = log
            .trades()
            .iter()
            .filter(|r| r.event == TradeEvent::Open)
            .count();
        let closes = log
            .trades()
            .iter()
            .filter(|r| matches!(r.event, TradeEvent::Close(_)))
            .count();
        assert_eq!(opens - closes, snap.position_count());
        // every open loses 6 and every close happens at 94
        let open_cost = 100.0 * snap.position_count() as f64;
        let expected_cash = 100_000.0 - 6.0 * closes as f64 - open_cost;
        assert!((snap.cash - expected_cash).abs() < 1e-6);
    }
}
