//! Per-(symbol, interval) generator instances.
//!
//! Built once from configuration and owned by the trading session; each
//! entry carries its own indicator state.

use std::collections::HashMap;

use crate::domain::config::{SessionConfig, StrategyConfig, StrategyKind};
use crate::domain::generator::{Composite, MaCrossover, PriceStrategy, RsiThreshold};

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<(String, String), Box<dyn PriceStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One price strategy per configured symbol on the signal interval.
    /// Trend following works on bars, not prices, so it registers nothing.
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut registry = Self::new();
        for symbol in &config.market.symbols {
            if let Some(strategy) = build_price_strategy(&config.strategy, config.strategy.kind) {
                tracing::debug!(
                    symbol = %symbol,
                    interval = %config.market.signal_interval,
                    strategy = %strategy.describe(),
                    "registered generator"
                );
                registry.register(symbol, &config.market.signal_interval, strategy);
            }
        }
        registry
    }

    /// Returns the strategy previously registered under the same key.
    pub fn register(
        &mut self,
        symbol: &str,
        interval: &str,
        strategy: Box<dyn PriceStrategy>,
    ) -> Option<Box<dyn PriceStrategy>> {
        self.strategies
            .insert((symbol.to_string(), interval.to_string()), strategy)
    }

    pub fn get_mut(
        &mut self,
        symbol: &str,
        interval: &str,
    ) -> Option<&mut (dyn PriceStrategy + 'static)> {
        self.strategies
            .get_mut(&(symbol.to_string(), interval.to_string()))
            .map(|s| s.as_mut())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

pub fn build_price_strategy(
    config: &StrategyConfig,
    kind: StrategyKind,
) -> Option<Box<dyn PriceStrategy>> {
    match kind {
        StrategyKind::MaCross => Some(Box::new(MaCrossover::new(config.ma_short, config.ma_long))),
        StrategyKind::Rsi => Some(Box::new(RsiThreshold::with_thresholds(
            config.rsi_period,
            config.rsi_oversold,
            config.rsi_overbought,
        ))),
        StrategyKind::Composite => {
            let members = config
                .members
                .iter()
                .filter(|m| **m != StrategyKind::Composite)
                .filter_map(|m| build_price_strategy(config, *m))
                .collect();
            Some(Box::new(Composite::new(members)))
        }
        StrategyKind::TrendFollow => None,
    }
}
