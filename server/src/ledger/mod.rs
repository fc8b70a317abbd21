//! Append-only score ledger
//!
//! The ranking engine only ever talks to the [`Ledger`] trait. Two backends
//! implement it:
//! - [`MemoryLedger`] keeps records in process memory (tests, demos)
//! - [`FileLedger`] appends JSON lines to a file and survives restarts
//!
//! Whichever backend is configured gets wrapped in a [`BoundedLedger`] so no
//! caller waits on storage longer than the configured timeout.

mod file;
mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

use crate::config::LedgerBackend;
use crate::error::LedgerError;
use async_trait::async_trait;
use log::info;
use shared::{GameMode, ScoreRecord};
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Durably appends one record. Either the record is committed and visible
    /// to later queries, or an error is returned and nothing changed.
    async fn append(&self, record: ScoreRecord) -> Result<(), LedgerError>;

    /// Counts records with a score strictly greater than `score`.
    async fn count_greater_than(
        &self,
        score: u32,
        mode: Option<GameMode>,
    ) -> Result<u64, LedgerError>;

    /// Returns up to `limit` records ordered by descending score. Equal
    /// scores keep their append order.
    async fn query_top_n(
        &self,
        mode: Option<GameMode>,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, LedgerError>;

    /// Number of records in the ledger.
    async fn len(&self) -> Result<u64, LedgerError>;
}

/// Opens the configured backend behind a timeout guard.
pub async fn open(
    backend: &LedgerBackend,
    call_timeout: Duration,
) -> Result<Arc<dyn Ledger>, LedgerError> {
    let inner: Arc<dyn Ledger> = match backend {
        LedgerBackend::Memory => {
            info!("Using in-memory score ledger");
            Arc::new(MemoryLedger::new())
        }
        LedgerBackend::File(path) => {
            let ledger = FileLedger::open(path).await?;
            info!(
                "Using file score ledger at {} ({} records)",
                path.display(),
                ledger.len().await?
            );
            Arc::new(ledger)
        }
    };

    Ok(Arc::new(BoundedLedger::new(inner, call_timeout)))
}

/// Shared scan used by the backends that keep records in memory.
pub(crate) fn count_above(records: &[ScoreRecord], score: u32, mode: Option<GameMode>) -> u64 {
    records
        .iter()
        .filter(|r| r.score > score && r.matches(mode))
        .count() as u64
}

/// Shared top-N selection used by the backends that keep records in memory.
pub(crate) fn top_n(
    records: &[ScoreRecord],
    mode: Option<GameMode>,
    limit: usize,
) -> Vec<ScoreRecord> {
    let mut selected: Vec<ScoreRecord> = records
        .iter()
        .filter(|r| r.matches(mode))
        .cloned()
        .collect();

    // Stable sort keeps append order among equal scores
    selected.sort_by_key(|r| Reverse(r.score));
    selected.truncate(limit);
    selected
}

/// Wraps a ledger so every call fails with [`LedgerError::Timeout`] instead of
/// hanging when storage stalls.
pub struct BoundedLedger {
    inner: Arc<dyn Ledger>,
    call_timeout: Duration,
}

impl BoundedLedger {
    pub fn new(inner: Arc<dyn Ledger>, call_timeout: Duration) -> Self {
        Self {
            inner,
            call_timeout,
        }
    }
}

#[async_trait]
impl Ledger for BoundedLedger {
    async fn append(&self, record: ScoreRecord) -> Result<(), LedgerError> {
        timeout(self.call_timeout, self.inner.append(record))
            .await
            .map_err(|_| LedgerError::Timeout(self.call_timeout))?
    }

    async fn count_greater_than(
        &self,
        score: u32,
        mode: Option<GameMode>,
    ) -> Result<u64, LedgerError> {
        timeout(self.call_timeout, self.inner.count_greater_than(score, mode))
            .await
            .map_err(|_| LedgerError::Timeout(self.call_timeout))?
    }

    async fn query_top_n(
        &self,
        mode: Option<GameMode>,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, LedgerError> {
        timeout(self.call_timeout, self.inner.query_top_n(mode, limit))
            .await
            .map_err(|_| LedgerError::Timeout(self.call_timeout))?
    }

    async fn len(&self) -> Result<u64, LedgerError> {
        timeout(self.call_timeout, self.inner.len())
            .await
            .map_err(|_| LedgerError::Timeout(self.call_timeout))?
    }
}
