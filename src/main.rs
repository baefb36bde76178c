use clap::Parser;
use papertrader::cli::{init_logging, run, Cli};

fn main() -> std::process::ExitCode {
    init_logging();
    run(Cli::parse())
}
