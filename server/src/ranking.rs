//! Score submission and leaderboard queries
//!
//! Ranks come in two flavours:
//! - `submit` reports a *counting rank*: one plus the number of scores in the
//!   whole ledger strictly above the new one, measured before it is appended.
//!   Equal scores share a rank.
//! - `leaderboard` reports each entry's position within the returned page.
//!
//! Counting and appending are two separate ledger calls with no lock held
//! between them. Two submissions racing each other can therefore both see the
//! same set of higher scores and report overlapping ranks. Ranks are advisory.

use crate::error::LedgerError;
use crate::ledger::Ledger;
use chrono::Utc;
use log::debug;
use shared::{
    is_high_score, GameMode, LeaderboardEntry, ScoreRecord, DEFAULT_LEADERBOARD_LIMIT,
};
use std::sync::Arc;
use uuid::Uuid;

/// What a submission earned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub rank: u64,
    pub is_high_score: bool,
}

pub struct RankingEngine {
    ledger: Arc<dyn Ledger>,
}

impl RankingEngine {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Ranks `score` against every recorded score, then records it.
    ///
    /// The submission is kept whether or not it is a high score. `user_id`
    /// must already be authenticated by the caller.
    pub async fn submit(
        &self,
        user_id: &str,
        username: &str,
        score: u32,
        mode: GameMode,
    ) -> Result<SubmitOutcome, LedgerError> {
        // Counted across all modes, before the new record exists
        let rank = self.ledger.count_greater_than(score, None).await? + 1;

        let record = ScoreRecord::new(
            Uuid::new_v4().to_string(),
            user_id,
            username,
            score,
            mode,
            Utc::now().date_naive(),
        );
        self.ledger.append(record).await?;

        let outcome = SubmitOutcome {
            rank,
            is_high_score: is_high_score(rank),
        };
        debug!(
            "Recorded score {} ({}) for {}: rank {}, high score {}",
            score, mode, username, outcome.rank, outcome.is_high_score
        );
        Ok(outcome)
    }

    /// Top scores, optionally for a single mode. Ranks are 1-based positions
    /// within this page, not global counting ranks.
    pub async fn leaderboard(
        &self,
        mode: Option<GameMode>,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let records = self.ledger.query_top_n(mode, limit).await?;

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(i, record)| LeaderboardEntry::from_record(record, i as u64 + 1))
            .collect())
    }

    pub async fn ledger_len(&self) -> Result<u64, LedgerError> {
        self.ledger.len().await
    }
}
