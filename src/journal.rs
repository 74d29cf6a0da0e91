//! Append-only trade journal (JSONL, one closed trade per line)

use crate::error::Result;
use crate::strategy::ExitReason;
use crate::types::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: String,
    pub chat_id: i64,
    pub symbol: String,
    pub side: Side,
    pub amount: Decimal,
    pub stake: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub reason: ExitReason,
    pub pnl: Decimal,
    pub next_stake: Decimal,
    pub loss_streak: u32,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Price PnL of a position, ignoring fees
pub fn position_pnl(side: Side, entry: Decimal, exit: Decimal, amount: Decimal) -> Decimal {
    match side {
        Side::Buy => (exit - entry) * amount,
        Side::Sell => (entry - exit) * amount,
    }
}

pub struct Journal {
    path: PathBuf,
    // serialize appends from concurrent sessions
    lock: Mutex<()>,
}

impl Journal {
    /// Journal at `path` (`~` is expanded); the file is created on first write
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(shellexpand::tilde(path).into_owned()),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, trade: &ClosedTrade) -> Result<()> {
        let line = serde_json::to_string(trade)?;
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every journaled trade back
    pub async fn load(&self) -> Result<Vec<ClosedTrade>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<ClosedTrade>(line).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio_test::assert_ok;

    fn trade(id: &str, reason: ExitReason, pnl: Decimal) -> ClosedTrade {
        ClosedTrade {
            id: id.to_string(),
            chat_id: 7,
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            amount: dec!(0.5),
            stake: dec!(50),
            entry_price: dec!(100),
            exit_price: dec!(101),
            reason,
            pnl,
            next_stake: dec!(50),
            loss_streak: 0,
            opened_at: Utc::now(),
            closed_at: Utc::now(),
        }
    }

    #[test]
    fn test_position_pnl() {
        assert_eq!(position_pnl(Side::Buy, dec!(100), dec!(101), dec!(0.5)), dec!(0.5));
        assert_eq!(position_pnl(Side::Sell, dec!(100), dec!(101), dec!(0.5)), dec!(-0.5));
        assert_eq!(position_pnl(Side::Sell, dec!(100), dec!(98), dec!(2)), dec!(4));
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trades.jsonl");
        let journal = Journal::new(path.to_str().unwrap());

        assert!(journal.load().await.unwrap().is_empty());

        assert_ok!(journal.append(&trade("a", ExitReason::TakeProfit, dec!(0.5))).await);
        assert_ok!(journal.append(&trade("b", ExitReason::StopLoss, dec!(-0.25))).await);

        let trades = journal.load().await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, "a");
        assert_eq!(trades[1].reason, ExitReason::StopLoss);
        assert_eq!(trades[1].pnl, dec!(-0.25));
    }

    #[tokio::test]
    async fn test_lines_are_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.jsonl");
        let journal = Journal::new(path.to_str().unwrap());
        journal.append(&trade("x", ExitReason::TakeProfit, dec!(1))).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["reason"], "TAKE_PROFIT");
        assert_eq!(value["side"], "BUY");
    }
}
