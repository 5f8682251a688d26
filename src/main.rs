use clap::{Parser, Subcommand};
use funding_rate_arbitrage::{
    config::{ArbConfig, ConfigDefaults},
    data::{load_funding_samples, load_price_samples},
    engine::BacktestEngine,
    utils::logger,
    Result,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "funding-arb")]
#[command(about = "Delta-neutral funding rate arbitrage backtester")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/funding_arb.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log file path
    #[arg(long, default_value = "logs/funding-arb.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay historical funding and price data
    Backtest {
        /// JSON file of funding rate samples
        #[arg(long)]
        funding_data: PathBuf,

        /// JSON file of price samples
        #[arg(long)]
        price_data: PathBuf,

        /// Densify funding series onto each venue's time grid before replay
        #[arg(long)]
        interpolate: bool,

        /// Fill bound in seconds for --interpolate
        #[arg(long, default_value_t = ConfigDefaults::MAX_INTERPOLATION_GAP_SECS)]
        interpolate_max_gap: u64,

        /// Write the entry/exit decision log to this JSON file
        #[arg(long)]
        decision_log: Option<PathBuf>,
    },
    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::init(&cli.log_level, &cli.log_file)?;

    info!(
        "Starting {} v{}",
        funding_rate_arbitrage::APP_NAME,
        funding_rate_arbitrage::VERSION
    );

    let config = ArbConfig::from_file(&cli.config)?;
    config.validate()?;
    info!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Commands::Backtest {
            funding_data,
            price_data,
            interpolate,
            interpolate_max_gap,
            decision_log,
        } => {
            run_backtest(
                config,
                funding_data,
                price_data,
                interpolate.then_some(interpolate_max_gap),
                decision_log,
            )
            .await
        }
        Commands::Validate => validate_config(config).await,
    }
}

async fn run_backtest(
    config: ArbConfig,
    funding_data: PathBuf,
    price_data: PathBuf,
    interpolate_max_gap: Option<u64>,
    decision_log: Option<PathBuf>,
) -> Result<()> {
    let funding = load_funding_samples(&funding_data)?;
    info!(
        samples = funding.len(),
        "Loaded funding data from: {}",
        funding_data.display()
    );

    let prices = load_price_samples(&price_data)?;
    info!(
        samples = prices.len(),
        "Loaded price data from: {}",
        price_data.display()
    );

    let mut engine = BacktestEngine::new(&config, &funding, &prices, interpolate_max_gap)?;
    let report = engine.run()?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = decision_log {
        engine.decision_log().write_json(&path)?;
        info!("Decision log written to: {}", path.display());
    }

    Ok(())
}

async fn validate_config(config: ArbConfig) -> Result<()> {
    config.validate()?;
    info!("Configuration is valid");
    println!("Configuration is valid");
    println!("  Venues: {}", config.connectors.len());
    println!("  Tokens: {}", config.tokens.len());
    println!(
        "  Min profitability (hourly): {}",
        config.min_funding_rate_profitability
    );
    println!("  Position size (quote): {}", config.position_size_quote);
    Ok(())
}
