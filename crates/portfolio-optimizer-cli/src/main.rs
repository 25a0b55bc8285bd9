mod commands;
mod config;
mod input;
mod output;
mod provider;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::backtest::BacktestArgs;
use commands::frontier::FrontierArgs;
use commands::optimize::OptimizeArgs;
use config::CliConfig;

/// Mean-variance portfolio optimization and historical backtesting
#[derive(Parser)]
#[command(
    name = "pfopt",
    version,
    about = "Mean-variance portfolio optimization and historical backtesting",
    long_about = "Optimizes long-only portfolios for maximum Sharpe ratio or minimum \
                  volatility, traces the efficient frontier, and backtests static \
                  allocations against daily price files, all with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Directory holding <TICKER>.csv price files (default ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// YAML file with default settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize weights for maximum Sharpe ratio or minimum volatility
    Optimize(OptimizeArgs),
    /// Backtest a static allocation over a date range
    Backtest(BacktestArgs),
    /// Trace the efficient frontier
    Frontier(FrontierArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

impl Cli {
    /// Log to stderr so stdout stays machine-readable.
    fn init_logging(&self) {
        let level = if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("failed to install log subscriber: {}", e);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    let config = match cli.config.as_deref().map(CliConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => fail(e),
    };
    let data_dir = config.resolve_data_dir(cli.data_dir.as_deref());

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Optimize(args) => commands::optimize::run_optimize(args, &config, &data_dir),
        Commands::Backtest(args) => commands::backtest::run_backtest(args, &config, &data_dir),
        Commands::Frontier(args) => commands::frontier::run_frontier(args, &config, &data_dir),
        Commands::Version => {
            println!("pfopt {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => fail(e),
    }
}

fn fail(e: Box<dyn std::error::Error>) -> ! {
    eprintln!("{}: {}", "error".red().bold(), e);
    process::exit(1);
}
