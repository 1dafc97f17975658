//! Trade records and the durable append-only trade log.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::TradeLogError;

/// Outcome of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TradeStatus {
    /// Both legs were accepted.
    Executed,
}

/// One hedged YES+NO trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Market traded.
    pub market_id: String,
    /// Market question.
    #[serde(default)]
    pub description: String,
    /// YES leg order id.
    pub yes_order_id: String,
    /// NO leg order id.
    pub no_order_id: String,
    /// YES quote the trade was sized on.
    pub yes_price: Decimal,
    /// NO quote the trade was sized on.
    pub no_price: Decimal,
    /// Share pairs bought.
    pub shares: Decimal,
    /// Dollars allocated.
    pub position_size: Decimal,
    /// `position_size * profit_margin`.
    pub expected_profit: Decimal,
    /// Margin at detection.
    pub profit_margin: Decimal,
    /// When the trade completed.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Trade status.
    pub status: TradeStatus,
}

impl TradeRecord {
    /// Key identifying a trade across retries.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.yes_order_id, self.no_order_id)
    }
}

/// Durable sink for trade records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeLog: Send + Sync {
    /// Append a record. Returns `false` if the same order pair was already written.
    async fn append(&self, record: &TradeRecord) -> Result<bool, TradeLogError>;
}

/// Trade log writing one JSON object per line.
#[derive(Debug)]
pub struct JsonlTradeLog {
    path: PathBuf,
    written: Mutex<HashSet<String>>,
}

impl JsonlTradeLog {
    /// Open a log, loading the keys of records already in the file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TradeLogError> {
        let path = path.into();
        let written = Self::read_records(&path)
            .await?
            .iter()
            .map(TradeRecord::dedup_key)
            .collect::<HashSet<_>>();

        debug!(path = %path.display(), existing = written.len(), "Trade log opened");
        Ok(Self {
            path,
            written: Mutex::new(written),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parseable record in a log file. A missing file is empty.
    pub async fn read_records(path: &Path) -> Result<Vec<TradeRecord>, TradeLogError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = line_no + 1, error = %e, "Skipping malformed trade log line"),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl TradeLog for JsonlTradeLog {
    async fn append(&self, record: &TradeRecord) -> Result<bool, TradeLogError> {
        let key = record.dedup_key();
        let mut written = self.written.lock().await;
        if written.contains(&key) {
            debug!(key = %key, "Trade already logged");
            return Ok(false);
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        written.insert(key);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn record(yes: &str, no: &str) -> TradeRecord {
        TradeRecord {
            market_id: "m1".to_string(),
            description: "Will it rain?".to_string(),
            yes_order_id: yes.to_string(),
            no_order_id: no.to_string(),
            yes_price: dec!(0.50),
            no_price: dec!(0.44),
            shares: dec!(1063.8297872340425531914893617),
            position_size: dec!(1000),
            expected_profit: dec!(41.2),
            profit_margin: dec!(0.0412),
            timestamp: OffsetDateTime::UNIX_EPOCH,
            status: TradeStatus::Executed,
        }
    }

    #[tokio::test]
    async fn append_writes_one_line_per_trade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.jsonl");
        let log = JsonlTradeLog::open(&path).await.unwrap();

        assert!(log.append(&record("y1", "n1")).await.unwrap());
        assert!(log.append(&record("y2", "n2")).await.unwrap());

        let records = JsonlTradeLog::read_records(&path).await.unwrap();
        assert_eq!(records, vec![record("y1", "n1"), record("y2", "n2")]);
    }

    #[tokio::test]
    async fn append_is_idempotent_per_order_pair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.jsonl");
        let log = JsonlTradeLog::open(&path).await.unwrap();

        assert!(log.append(&record("y1", "n1")).await.unwrap());
        assert!(!log.append(&record("y1", "n1")).await.unwrap());

        // Reopening keeps the keys already on disk.
        let reopened = JsonlTradeLog::open(&path).await.unwrap();
        assert!(!reopened.append(&record("y1", "n1")).await.unwrap());

        assert_eq!(JsonlTradeLog::read_records(&path).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.jsonl");
        let good = serde_json::to_string(&record("y1", "n1")).unwrap();
        tokio::fs::write(&path, format!("not json\n{good}\n\n")).await.unwrap();

        let records = JsonlTradeLog::read_records(&path).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = JsonlTradeLog::read_records(&dir.path().join("absent.jsonl"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn record_serializes_decimals_as_strings() {
        let json = serde_json::to_value(record("y1", "n1")).unwrap();
        assert_eq!(json["expected_profit"], "41.2");
        assert_eq!(json["status"], "executed");
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
    }
}
