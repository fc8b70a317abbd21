use super::{count_above, top_n, Ledger};
use crate::error::LedgerError;
use async_trait::async_trait;
use shared::{GameMode, ScoreRecord};
use tokio::sync::RwLock;

/// Ledger held entirely in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryLedger {
    records: RwLock<Vec<ScoreRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn append(&self, record: ScoreRecord) -> Result<(), LedgerError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn count_greater_than(
        &self,
        score: u32,
        mode: Option<GameMode>,
    ) -> Result<u64, LedgerError> {
        let records = self.records.read().await;
        Ok(count_above(&records, score, mode))
    }

    async fn query_top_n(
        &self,
        mode: Option<GameMode>,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, LedgerError> {
        let records = self.records.read().await;
        Ok(top_n(&records, mode, limit))
    }

    async fn len(&self) -> Result<u64, LedgerError> {
        Ok(self.records.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn record(id: &str, score: u32) -> ScoreRecord {
        ScoreRecord::new(
            id.to_string(),
            "user-1",
            "Tester",
            score,
            GameMode::Walls,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_append_grows_ledger() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.len().await.unwrap(), 0);

        ledger.append(record("a", 10)).await.unwrap();
        ledger.append(record("b", 10)).await.unwrap();

        assert_eq!(ledger.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let ledger = Arc::new(MemoryLedger::new());

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.append(record(&format!("r{}", i), i)).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(ledger.len().await.unwrap(), 64);
        assert_eq!(ledger.query_top_n(None, 1).await.unwrap()[0].score, 63);
    }
}
