//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::csv_audit_adapter::CsvAuditAdapter;
use crate::adapters::csv_feed_adapter::CsvFeedAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::SessionConfig;
use crate::domain::engine::AccountEngine;
use crate::domain::error::PapertraderError;
use crate::domain::registry::StrategyRegistry;
use crate::domain::session::{run_pipeline, TradingSession};

#[derive(Parser, Debug)]
#[command(name = "papertrader", about = "Paper-trading account engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a feed through the configured strategy and paper account
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        feed: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, feed } => run_session(&config, &feed),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PapertraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_session_config(path: &PathBuf) -> Result<SessionConfig, ExitCode> {
    let adapter = load_config(path)?;
    SessionConfig::from_port(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_session(config_path: &PathBuf, feed_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_session_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match execute_session(&config, feed_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute_session(config: &SessionConfig, feed_path: &PathBuf) -> Result<(), PapertraderError> {
    let audit = Arc::new(CsvAuditAdapter::open(
        &config.audit.trades_path,
        &config.audit.equity_path,
    )?);
    let engine = Arc::new(AccountEngine::new(config.initial_equity, audit)?);
    let registry = StrategyRegistry::from_config(config);
    tracing::info!(
        symbols = ?config.market.symbols,
        strategy = %config.strategy.kind,
        generators = registry.len(),
        "session configured"
    );
    let mut session = TradingSession::new(Arc::clone(&engine), registry, config);

    eprintln!("Reading feed from {}", feed_path.display());
    let feed = CsvFeedAdapter::from_path(feed_path)?;
    let result = run_pipeline(feed, &mut session, config.queue_capacity);

    // Close the audit log and report even when the feed failed part way.
    let closed = engine.close();
    print_summary(&engine, result.as_ref().map(|s| s.events).unwrap_or(0));
    result?;
    closed
}

fn print_summary(engine: &AccountEngine, events: u64) {
    let snap = engine.snapshot();
    let equity = snap.total_equity();
    let ret = (equity - snap.initial_equity) / snap.initial_equity * 100.0;

    println!("Events processed: {}", events);
    println!("Initial equity:   {:.2}", snap.initial_equity);
    println!("Cash:             {:.2}", snap.cash);
    println!("Unrealized P&L:   {:.2}", snap.unrealized_pnl());
    println!("Final equity:     {:.2}", equity);
    println!("Return:           {:.2}%", ret);
    println!("Open positions:   {}", snap.position_count());
    let mut symbols: Vec<&String> = snap.positions.keys().collect();
    symbols.sort();
    for symbol in symbols {
        if let Some(pos) = snap.get_position(symbol) {
            println!(
                "  {} {} size={:.8} entry={:.8} stop={:.8}",
                pos.symbol, pos.direction, pos.size, pos.entry_price, pos.stop_loss
            );
        }
    }
    let failures = engine.audit_failures();
    if failures > 0 {
        println!("Audit failures:   {}", failures);
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_session_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let registry = StrategyRegistry::from_config(&config);
    eprintln!("  Initial equity: {}", config.initial_equity);
    eprintln!("  Symbols:        {}", config.market.symbols.join(", "));
    eprintln!(
        "  Intervals:      signal {} / trend {}",
        config.market.signal_interval, config.market.trend_interval
    );
    eprintln!("  Strategy:       {}", config.strategy.kind);
    eprintln!("  Generators:     {}", registry.len());
    eprintln!(
        "  Audit log:      {} / {}",
        config.audit.trades_path.display(),
        config.audit.equity_path.display()
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
