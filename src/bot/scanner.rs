//! The scan loop: poll markets, detect, execute the best opportunity, sleep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::stats::{RunStatistics, StatsSnapshot};
use crate::arbitrage::{ArbitrageDetector, ArbitrageExecutor};
use crate::config::Config;
use crate::error::GatewayError;
use crate::market::MarketGateway;
use crate::metrics;
use crate::trading::{TradeLog, TradeRecord};

/// Back-off after a poll that returned no markets.
pub const EMPTY_MARKETS_BACKOFF: Duration = Duration::from_secs(5);

/// Back-off after a failed cycle.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// A statistics block is logged every this many scans.
pub const STATS_LOG_INTERVAL: u64 = 100;

/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// Cycling.
    Running,
    /// Shutdown observed.
    Stopped,
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The gateway returned no markets; not counted as a scan.
    NoMarkets,
    /// A scan ran.
    Scanned {
        /// Opportunities detected.
        opportunities: usize,
        /// Trade executed on the best opportunity, if any.
        trade: Option<TradeRecord>,
    },
}

/// Arbitrage scan loop.
pub struct ArbitrageBot {
    gateway: Arc<dyn MarketGateway>,
    detector: ArbitrageDetector,
    executor: ArbitrageExecutor,
    stats: RunStatistics,
    scan_interval: Duration,
    paper_trading: bool,
    state: BotState,
    stats_reports: u64,
    stats_tx: Option<watch::Sender<StatsSnapshot>>,
}

impl ArbitrageBot {
    /// Build the loop from config around a gateway chosen by the caller.
    pub fn new(gateway: Arc<dyn MarketGateway>, config: &Config) -> Self {
        Self {
            detector: ArbitrageDetector::from_config(config),
            executor: ArbitrageExecutor::from_config(gateway.clone(), config),
            gateway,
            stats: RunStatistics::new(),
            scan_interval: config.scan_interval(),
            paper_trading: config.paper_trading,
            state: BotState::Running,
            stats_reports: 0,
            stats_tx: None,
        }
    }

    /// Attach a durable trade log to the executor.
    pub fn with_trade_log(mut self, trade_log: Arc<dyn TradeLog>) -> Self {
        self.executor = self.executor.with_trade_log(trade_log);
        self
    }

    /// Publish a statistics snapshot after every cycle.
    pub fn with_stats_publisher(mut self, tx: watch::Sender<StatsSnapshot>) -> Self {
        self.stats_tx = Some(tx);
        self
    }

    /// Current state.
    pub fn state(&self) -> BotState {
        self.state
    }

    /// Current counters.
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Periodic statistics reports emitted, one per `STATS_LOG_INTERVAL` scans.
    pub fn stats_reports(&self) -> u64 {
        self.stats_reports
    }

    /// Trades executed so far.
    pub fn trade_history(&self) -> &[TradeRecord] {
        self.executor.trade_history()
    }

    /// Read-only snapshot of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut snapshot = self
            .stats
            .snapshot(self.paper_trading, self.gateway.paper_statistics());
        snapshot.running = self.state == BotState::Running;
        snapshot
    }

    /// Run one poll-detect-execute cycle.
    #[instrument(skip(self), fields(scan = self.stats.scans + 1))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, GatewayError> {
        let _timer = metrics::timer_scan();

        let markets = self.gateway.list_markets(true).await.inspect_err(|_| {
            metrics::inc_gateway_errors("list_markets");
        })?;

        if markets.is_empty() {
            return Ok(CycleOutcome::NoMarkets);
        }

        let opportunities = self.detector.scan(&markets);
        self.stats.record_scan(opportunities.len());
        metrics::inc_scans();
        metrics::add_opportunities_detected(opportunities.len() as u64);
        debug!(
            markets = markets.len(),
            opportunities = opportunities.len(),
            "Scan complete"
        );

        let trade = match opportunities.first() {
            Some(best) => {
                info!(
                    count = opportunities.len(),
                    market = %best.market_id,
                    margin = %best.profit_margin,
                    "Executing best opportunity"
                );
                self.executor.execute(best).await
            }
            None => None,
        };

        if let Some(record) = &trade {
            self.stats.record_trade(record);
        }

        if self.stats.scans % STATS_LOG_INTERVAL == 0 {
            self.stats_reports += 1;
            self.snapshot().log();
        }

        Ok(CycleOutcome::Scanned {
            opportunities: opportunities.len(),
            trade,
        })
    }

    /// Cycle until `shutdown` turns true, then return the final snapshot.
    ///
    /// Errors never leave the loop: they are logged and followed by a back-off.
    /// Shutdown is checked before each cycle and wakes the inter-cycle sleep;
    /// a cycle already placing orders runs to completion.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> StatsSnapshot {
        self.state = BotState::Running;
        info!(
            gateway = self.gateway.name(),
            interval_ms = self.scan_interval.as_millis() as u64,
            "Scan loop started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let delay = match self.run_cycle().await {
                Ok(CycleOutcome::NoMarkets) => {
                    warn!(backoff_s = EMPTY_MARKETS_BACKOFF.as_secs(), "No markets returned");
                    EMPTY_MARKETS_BACKOFF
                }
                Ok(CycleOutcome::Scanned { .. }) => self.scan_interval,
                Err(e) => {
                    error!(error = %e, backoff_s = ERROR_BACKOFF.as_secs(), "Scan cycle failed");
                    ERROR_BACKOFF
                }
            };
            self.publish();

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                stop = shutdown.wait_for(|stop| *stop) => {
                    if stop.is_err() {
                        warn!("Shutdown channel closed, stopping");
                    }
                    break;
                }
            }
        }

        self.state = BotState::Stopped;
        info!("Scan loop stopped");
        let snapshot = self.snapshot();
        snapshot.log();
        self.publish();
        snapshot
    }

    fn publish(&self) {
        if let Some(tx) = &self.stats_tx {
            tx.send_replace(self.snapshot());
        }
    }
}
