//! Polymarket YES/NO spread arbitrage bot entry point.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use polymarket_spread_arb::api::{create_router, AppState};
use polymarket_spread_arb::arbitrage::{executor::MIN_TICKET, ArbitrageDetector, Rejection};
use polymarket_spread_arb::bot::{ArbitrageBot, StatsSnapshot};
use polymarket_spread_arb::config::Config;
use polymarket_spread_arb::market::{MarketGateway, PaperTradingClient, PolymarketClient};
use polymarket_spread_arb::metrics;
use polymarket_spread_arb::signing::signature_type_name;
use polymarket_spread_arb::trading::JsonlTradeLog;
use polymarket_spread_arb::utils::{format_currency, format_percentage, shutdown_signal};

/// Polymarket YES/NO spread arbitrage bot.
#[derive(Parser, Debug)]
#[command(name = "spread-arb")]
#[command(about = "Buys YES and NO together when the pair costs less than $1 after fees")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scan loop (default).
    Run {
        /// Trade against the paper simulator.
        #[arg(long)]
        paper: bool,

        /// Skip the live trading confirmation prompt.
        #[arg(long)]
        yes: bool,

        /// HTTP server port for health/status/metrics.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Check API credentials and balance.
    CheckBalance,

    /// Run one detection pass and print the ranked opportunities.
    Scan {
        /// Number of opportunities to print.
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load();
    init_tracing(args.verbose, config.as_ref().ok())?;
    let config = config.context("Failed to load configuration")?;

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::CheckBalance) => cmd_check_balance(config).await,
        Some(Command::Scan { limit }) => cmd_scan(config, limit, args.verbose).await,
        Some(Command::Run { paper, yes, port }) => cmd_run(config, paper, yes, port).await,
        None => cmd_run(config, false, false, None).await,
    }
}

/// Install the tracing subscriber: stdout (plain or JSON) plus an optional log file.
fn init_tracing(verbose: bool, config: Option<&Config>) -> anyhow::Result<()> {
    let filter = if verbose || config.is_some_and(|c| c.verbose) {
        EnvFilter::new("polymarket_spread_arb=debug,info")
    } else {
        let level = config.map(|c| c.rust_log.as_str()).unwrap_or("info");
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json = config.is_some_and(|c| c.log_json);
    let (plain_layer, json_layer) = if json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };

    let file_layer = match config.and_then(|c| c.log_file.as_deref()) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(config: Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPREAD ARB BOT - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Mode: {}", config.mode_label());
    println!("  CLOB URL: {}", config.polymarket_clob_url);
    println!("  Chain ID: {}", config.polymarket_chain_id);
    println!(
        "  Credentials: {}",
        if config.has_credentials() { "present" } else { "absent" }
    );
    println!(
        "  Signature Type: {} ({})",
        config.polymarket_signature_type,
        signature_type_name(config.polymarket_signature_type)
    );
    println!("  Min Profit Margin: {}", format_percentage(config.min_profit_pct));
    println!("  Fee Rate: {}", format_percentage(config.fee_rate));
    println!("  Max Position Size: {}", format_currency(config.max_position_size));
    println!("  Max Slippage: {}", format_percentage(config.max_slippage_pct));
    println!("  Scan Interval: {}s", config.scan_interval_seconds);
    if config.paper_trading {
        println!("  Paper Balance: {}", format_currency(config.paper_trading_balance));
    }
    println!("  Trade Log: {}", config.trade_log_path);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check API credentials and balance.
async fn cmd_check_balance(config: Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPREAD ARB BOT - BALANCE CHECK");
    println!("======================================================================");
    println!("Host: {}", config.polymarket_clob_url);

    let client = PolymarketClient::new(&config)?;
    if !client.has_credentials() {
        println!("Credentials: MISSING");
        return Err(anyhow::anyhow!(
            "POLYMARKET_API_KEY and POLYMARKET_API_SECRET are required"
        ));
    }

    print!("Getting USDC balance... ");
    match client.get_balance().await {
        Ok(balance) => {
            println!("OK");
            println!("  USDC Balance: {}", format_currency(balance));
            if balance < MIN_TICKET {
                println!("  WARNING: balance below the {} minimum ticket", format_currency(MIN_TICKET));
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(e.into());
        }
    }

    println!("======================================================================");
    Ok(())
}

/// Run one detection pass against live market data.
async fn cmd_scan(config: Config, limit: usize, verbose: bool) -> anyhow::Result<()> {
    let client = PolymarketClient::new(&config)?;
    let detector = ArbitrageDetector::from_config(&config);

    let markets = client.list_markets(true).await?;
    let opportunities = detector.scan(&markets);

    println!("======================================================================");
    println!(
        "Scanned {} markets, {} opportunities",
        markets.len(),
        opportunities.len()
    );
    println!("======================================================================");
    for (rank, opp) in opportunities.iter().take(limit).enumerate() {
        println!(
            "{:>3}. {} | YES ${} + NO ${} = ${} | margin {}",
            rank + 1,
            opp.description,
            opp.yes_price,
            opp.no_price,
            opp.total_cost,
            format_percentage(opp.profit_margin)
        );
    }

    if verbose {
        let mut reasons: BTreeMap<&'static str, usize> = BTreeMap::new();
        for market in &markets {
            let key = match detector.diagnose(market) {
                Ok(_) => continue,
                Err(Rejection::NonPositivePrice { .. }) => "non-positive price",
                Err(Rejection::Unprofitable { .. }) => "cost with fees too high",
                Err(Rejection::BelowMinimum { .. }) => "below configured minimum",
            };
            *reasons.entry(key).or_default() += 1;
        }
        println!("----------------------------------------------------------------------");
        for (reason, count) in reasons {
            println!("  rejected ({}): {}", reason, count);
        }
    }

    Ok(())
}

/// Build the gateway for the configured mode.
fn build_gateway(config: &Config) -> anyhow::Result<Arc<dyn MarketGateway>> {
    let live = PolymarketClient::new(config).context("Failed to build Polymarket client")?;

    if config.paper_trading {
        let paper = PaperTradingClient::new(config.paper_trading_balance)
            .with_market_source(Arc::new(live));
        Ok(Arc::new(paper))
    } else {
        Ok(Arc::new(live))
    }
}

/// Ask the operator to confirm live trading.
async fn confirm_live_trading() -> anyhow::Result<bool> {
    println!("WARNING: live trading sends real orders with real funds.");
    println!("Continue with live trading? (yes/no)");

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read confirmation")?;

    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

/// Run the scan loop.
async fn cmd_run(
    mut config: Config,
    paper: bool,
    yes: bool,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if paper {
        config.paper_trading = true;
    }
    if let Some(port) = port {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("========================================");
    info!("SPREAD ARB BOT - {}", config.mode_label());
    info!("========================================");
    info!("Min profit margin:    {}", format_percentage(config.min_profit_pct));
    info!("Fee rate:             {}", format_percentage(config.fee_rate));
    info!("Max position size:    {}", format_currency(config.max_position_size));
    info!("Max slippage:         {}", format_percentage(config.max_slippage_pct));
    info!("Scan interval:        {}s", config.scan_interval_seconds);
    info!("========================================");

    if !config.paper_trading && !yes && !confirm_live_trading().await? {
        info!("Live trading not confirmed, exiting");
        return Ok(());
    }

    let gateway = build_gateway(&config)?;

    match gateway.get_balance().await {
        Ok(balance) => {
            info!(balance = %balance, "Starting balance: {}", format_currency(balance));
            if !config.paper_trading && balance < MIN_TICKET {
                warn!(
                    "Balance {} is below the {} minimum ticket; trades will be skipped",
                    format_currency(balance),
                    format_currency(MIN_TICKET)
                );
            }
        }
        Err(e) => warn!(error = %e, "Could not fetch starting balance"),
    }

    let trade_log = JsonlTradeLog::open(&config.trade_log_path)
        .await
        .with_context(|| format!("Failed to open trade log {}", config.trade_log_path))?;

    let (stats_tx, stats_rx) = watch::channel(StatsSnapshot::initial(config.paper_trading));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut app_state = AppState::new(stats_rx, gateway.name());
    match metrics::install_recorder() {
        Ok(handle) => app_state = app_state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Metrics disabled"),
    }

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let mut server_shutdown = shutdown_rx.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down...");
        let _ = shutdown_tx.send(true);
    });

    let mut bot = ArbitrageBot::new(gateway, &config)
        .with_trade_log(Arc::new(trade_log))
        .with_stats_publisher(stats_tx);

    app_state.set_ready(true);
    let snapshot = bot.run(shutdown_rx).await;
    app_state.set_ready(false);

    if let Some(paper) = &snapshot.paper {
        info!(
            "Paper balance {} (started at {}), realized profit {}",
            format_currency(paper.current_balance),
            format_currency(paper.initial_balance),
            format_currency(paper.total_profit)
        );
    }
    info!(
        trades = snapshot.trades_executed,
        "Expected profit of executed trades: {}",
        format_currency(snapshot.total_expected_profit)
    );

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server error"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
    }

    Ok(())
}
