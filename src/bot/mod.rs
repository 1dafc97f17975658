//! Bot module: the scan loop and its run statistics.

pub mod scanner;
pub mod stats;

pub use scanner::{ArbitrageBot, BotState, CycleOutcome};
pub use stats::{RunStatistics, StatsSnapshot};
