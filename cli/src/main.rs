//! CLI entry point for nanofolio.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use nanofolio::Symbol;
use nanofolio_cli::commands;
use nanofolio_cli::config::{Config, ObjectiveKind};
use nanofolio_cli::error::{Error, Result};
use nanofolio_cli::price_file::PriceFile;
use nanofolio_cli::weights_file::WeightsFile;

#[derive(Parser)]
#[command(name = "nanofolio")]
#[command(about = "Mean-variance optimization, Monte Carlo search, and whole-share allocation")]
#[command(version)]
struct Cli {
    /// Path to config.toml (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PriceArgs {
    /// Path to prices.json
    prices: PathBuf,

    /// Comma-separated tickers to keep (default: every column)
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// Annual risk-free rate, e.g. 0.02
    #[arg(long)]
    risk_free_rate: Option<f64>,

    /// Cash to allocate
    #[arg(long)]
    budget: Option<f64>,

    /// Skip the discrete allocation step
    #[arg(long)]
    no_allocate: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Maximum-Sharpe (or minimum-volatility) weights, then whole shares
    Optimize {
        #[command(flatten)]
        prices: PriceArgs,

        /// Minimize volatility instead of maximizing Sharpe
        #[arg(long)]
        min_volatility: bool,
    },

    /// Random portfolio search; allocates the best-Sharpe sample
    Simulate {
        #[command(flatten)]
        prices: PriceArgs,

        /// Number of random portfolios
        #[arg(long)]
        num_portfolios: Option<usize>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Whole shares for a weights file at the latest prices
    Allocate {
        /// Path to weights.json
        weights: PathBuf,

        /// Path to prices.json
        prices: PathBuf,

        /// Cash to allocate
        #[arg(long)]
        budget: Option<f64>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    match run(cli.command, config, cli.json) {
        Ok(output) => println!("{output}"),
        Err(e) => match &e {
            Error::Core(nanofolio::Error::DataUnavailable(msg)) => {
                eprintln!("No data: {msg}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
    }
}

fn run(command: Command, mut config: Config, json: bool) -> Result<String> {
    match command {
        Command::Optimize {
            prices,
            min_volatility,
        } => {
            apply_overrides(&mut config, &prices);
            if min_volatility {
                config.optimizer.objective = ObjectiveKind::MinVolatility;
            }
            config.validate()?;
            let history = load_history(&prices)?;
            commands::render(&commands::optimize(&config, &history, !prices.no_allocate)?, json)
        }
        Command::Simulate {
            prices,
            num_portfolios,
            seed,
        } => {
            apply_overrides(&mut config, &prices);
            if let Some(n) = num_portfolios {
                config.simulation.num_portfolios = n;
            }
            if let Some(s) = seed {
                config.simulation.seed = s;
            }
            config.validate()?;
            let history = load_history(&prices)?;
            commands::render(&commands::simulate(&config, &history, !prices.no_allocate)?, json)
        }
        Command::Allocate {
            weights,
            prices,
            budget,
        } => {
            if let Some(b) = budget {
                config.allocation.budget = b;
            }
            config.validate()?;
            let weights = WeightsFile::load(&weights)?;
            let history = PriceFile::load(&prices)?.into_history(Some(&weights.symbols()))?;
            let report = commands::allocate(&config, &history, &weights.to_weight_vector())?;
            commands::render(&report, json)
        }
    }
}

fn apply_overrides(config: &mut Config, args: &PriceArgs) {
    if let Some(rf) = args.risk_free_rate {
        config.optimizer.risk_free_rate = rf;
    }
    if let Some(b) = args.budget {
        config.allocation.budget = b;
    }
}

fn load_history(args: &PriceArgs) -> Result<nanofolio::PriceHistory> {
    let tickers: Option<Vec<Symbol>> = args
        .tickers
        .as_ref()
        .map(|list| list.iter().map(|t| Symbol::new(t)).filter(|s| !s.is_empty()).collect());
    PriceFile::load(&args.prices)?.into_history(tickers.as_deref())
}
