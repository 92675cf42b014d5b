//! `kmarket` command-line interface.

pub mod commands;
pub mod error;

use clap::Parser;
use clap::Subcommand;
use kmarket_core::MarketConfig;
use kmarket_core::Marketplace;
use kmarket_core::config::HOME_ENV_VAR;
use std::path::PathBuf;
use tracing::Level;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub use error::CliError;
pub use error::Result;

/// Buy and sell knowledge packages; search them by keyword and meaning
#[derive(Parser, Debug)]
#[command(name = "kmarket")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Marketplace home (config, database, summary index)
    #[arg(long, global = true, env = HOME_ENV_VAR)]
    pub home: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hybrid keyword + semantic search
    Search(SearchArgs),

    /// List a package for sale
    Sell(SellArgs),

    /// Remove a listing
    Delist {
        id: String,
    },

    /// Print one listing
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Record a completed purchase
    RecordSale {
        id: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Maximum results (defaults to the configured limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct SellArgs {
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Comma-separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long, default_value_t = 0.0)]
    pub price: f64,

    #[arg(long, default_value = "")]
    pub seller: String,

    /// Text embedded for semantic search (defaults to the description)
    #[arg(long)]
    pub summary: Option<String>,
}

/// Route logs to stderr so stdout stays parseable. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(home: Option<PathBuf>) -> Result<MarketConfig> {
    let config = match home {
        Some(home) => MarketConfig::load_from_home(home)?,
        None => MarketConfig::load()?,
    };
    debug!("Marketplace home: {}", config.home.display());
    Ok(config)
}

pub async fn run_main(cli: Cli) -> Result<()> {
    let config = load_config(cli.home)?;
    let mut market = Marketplace::open(&config)?;

    match cli.command {
        Command::Search(args) => {
            let limit = args.limit.unwrap_or(config.marketplace.default_limit);
            commands::search(&market, &args.query.join(" "), limit, args.json).await
        }
        Command::Sell(args) => commands::sell(&mut market, args).await,
        Command::Delist { id } => commands::delist(&mut market, &id).await,
        Command::Show { id, json } => commands::show(&market, &id, json).await,
        Command::RecordSale { id } => commands::record_sale(&market, &id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parsing() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sell_splits_tags() {
        let cli = Cli::try_parse_from([
            "kmarket", "sell", "--id", "ts", "--name", "TS Handbook", "--tags",
            "typescript,guide",
        ])
        .unwrap();
        let Command::Sell(args) = cli.command else {
            panic!("expected sell");
        };
        assert_eq!(args.tags, vec!["typescript", "guide"]);
        assert_eq!(args.price, 0.0);
        assert!(args.summary.is_none());
    }

    #[test]
    fn test_search_joins_words_and_counts_verbosity() {
        let cli = Cli::try_parse_from(["kmarket", "-vv", "search", "ml", "training", "-l", "3"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query.join(" "), "ml training");
        assert_eq!(args.limit, Some(3));
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["kmarket", "search"]).is_err());
    }
}
