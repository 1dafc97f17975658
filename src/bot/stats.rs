//! Run statistics owned by the scan loop.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::market::PaperStatistics;
use crate::trading::TradeRecord;
use crate::utils::{format_currency, format_duration, format_percentage};

/// Counters for one run of the scan loop. Reset only on restart.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    /// Completed scans.
    pub scans: u64,
    /// Opportunities seen across all scans.
    pub opportunities_found: u64,
    /// Trades executed.
    pub trades_executed: u64,
    /// Sum of expected profit over executed trades.
    pub total_expected_profit: Decimal,
    /// Wall-clock start time.
    pub start_time: OffsetDateTime,
    started: Instant,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    /// Start a fresh set of counters.
    pub fn new() -> Self {
        Self {
            scans: 0,
            opportunities_found: 0,
            trades_executed: 0,
            total_expected_profit: Decimal::ZERO,
            start_time: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }

    /// Count a completed scan and the opportunities it found.
    pub fn record_scan(&mut self, opportunities: usize) {
        self.scans += 1;
        self.opportunities_found += opportunities as u64;
    }

    /// Count an executed trade.
    pub fn record_trade(&mut self, record: &TradeRecord) {
        self.trades_executed += 1;
        self.total_expected_profit += record.expected_profit;
    }

    /// Time since the counters started.
    pub fn runtime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Read-only copy for the log and the HTTP status endpoint.
    pub fn snapshot(&self, paper_trading: bool, paper: Option<PaperStatistics>) -> StatsSnapshot {
        StatsSnapshot {
            scans: self.scans,
            opportunities_found: self.opportunities_found,
            trades_executed: self.trades_executed,
            total_expected_profit: self.total_expected_profit,
            runtime_seconds: self.runtime().as_secs(),
            start_time: self.start_time,
            paper_trading,
            running: true,
            paper,
        }
    }
}

/// Point-in-time view of the run statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Completed scans.
    pub scans: u64,
    /// Opportunities seen.
    pub opportunities_found: u64,
    /// Trades executed.
    pub trades_executed: u64,
    /// Expected profit of executed trades.
    pub total_expected_profit: Decimal,
    /// Seconds since start.
    pub runtime_seconds: u64,
    /// Start time.
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    /// Whether the engine trades against the simulator.
    pub paper_trading: bool,
    /// Whether the loop is still running.
    pub running: bool,
    /// Simulator ledger, in paper mode.
    pub paper: Option<PaperStatistics>,
}

impl StatsSnapshot {
    /// Snapshot published before the loop has run.
    pub fn initial(paper_trading: bool) -> Self {
        RunStatistics::new().snapshot(paper_trading, None)
    }

    /// Emit the snapshot as an operator-facing log block.
    pub fn log(&self) {
        info!("========================================");
        info!("STATISTICS");
        info!("========================================");
        info!("Runtime:              {}", format_duration(Duration::from_secs(self.runtime_seconds)));
        info!("Scans:                {}", self.scans);
        info!("Opportunities found:  {}", self.opportunities_found);
        info!("Trades executed:      {}", self.trades_executed);
        info!("Expected profit:      {}", format_currency(self.total_expected_profit));
        if let Some(paper) = &self.paper {
            info!("----------------------------------------");
            info!("Paper balance:        {}", format_currency(paper.current_balance));
            info!("Open positions:       {}", paper.active_positions);
            info!("Completed trades:     {}", paper.completed_trades);
            info!("Realized profit:      {}", format_currency(paper.total_profit));
            info!("ROI:                  {}", format_percentage(paper.roi / Decimal::ONE_HUNDRED));
        }
        info!("========================================");
    }
}
