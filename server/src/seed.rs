//! Demo data for local play and manual testing

use crate::error::LedgerError;
use crate::network::AppState;
use chrono::{Duration, Utc};
use log::info;
use shared::{GameMode, LiveSession};

pub const DEMO_EMAIL: &str = "demo@snake.io";
pub const DEMO_PASSWORD: &str = "demo";

const MOCK_USERNAMES: [&str; 10] = [
    "ViperMaster",
    "PythonKing",
    "Anaconda",
    "CoilCrusher",
    "FangFury",
    "SlitherStrike",
    "VenomVoice",
    "RattleSnake",
    "CobraCommander",
    "MambaMentality",
];

/// (id, player id, player name, score, mode, viewers, minutes since start)
const DEMO_GAMES: [(&str, &str, &str, u32, GameMode, u64, i64); 3] = [
    ("game1", "20", "NeonViper", 340, GameMode::Walls, 12, 6),
    ("game2", "21", "PixelHunter", 180, GameMode::PassThrough, 8, 4),
    ("game3", "22", "ArcadeKing", 520, GameMode::Walls, 24, 2),
];

/// Adds the demo account, mock players with one score each, and a few live
/// games. Accounts that already exist are left alone along with their scores.
///
/// Demo scores only go into an empty ledger. Accounts live in memory but a
/// file ledger outlives them, so after a restart the accounts are recreated
/// while the scores from the first run are reused.
pub async fn seed(state: &AppState) -> Result<(), LedgerError> {
    info!("Seeding demo data...");
    let seed_scores = state.ranking.ledger_len().await? == 0;
    if !seed_scores {
        info!("Ledger already has scores, skipping demo scores");
    }

    if state.users.find_by_email(DEMO_EMAIL).await.is_none() {
        if let Ok(user) = state
            .users
            .create_user_with_id("1", "DemoPlayer", DEMO_EMAIL, DEMO_PASSWORD)
            .await
        {
            if seed_scores {
                state
                    .ranking
                    .submit(&user.id, &user.username, 100, GameMode::Walls)
                    .await?;
            }
        }
    }

    for (i, name) in MOCK_USERNAMES.iter().enumerate() {
        let email = format!("{}@snake.io", name.to_lowercase());
        if state.users.find_by_email(&email).await.is_some() {
            continue;
        }

        let Ok(user) = state.users.create_user(name, &email, "password").await else {
            continue;
        };
        if seed_scores {
            let score = (MOCK_USERNAMES.len() - i) as u32 * 500;
            let mode = if i % 2 == 0 {
                GameMode::Walls
            } else {
                GameMode::PassThrough
            };
            state
                .ranking
                .submit(&user.id, &user.username, score, mode)
                .await?;
        }
    }

    let now = Utc::now();
    for (id, player_id, player_name, score, mode, viewers, minutes_ago) in DEMO_GAMES {
        if state.sessions.get(id).await.is_some() {
            continue;
        }
        state
            .sessions
            .insert(LiveSession {
                id: id.to_string(),
                player_id: player_id.to_string(),
                player_name: player_name.to_string(),
                current_score: score,
                mode,
                status: "playing".to_string(),
                started_at: now - Duration::minutes(minutes_ago),
                viewer_count: viewers,
            })
            .await;
    }

    info!(
        "Seeding complete: {} users, {} scores, {} live games",
        state.users.len().await,
        state.ranking.ledger_len().await?,
        state.sessions.len().await
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{FileLedger, MemoryLedger};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_populates_everything() {
        let state = AppState::new(Arc::new(MemoryLedger::new()));
        seed(&state).await.unwrap();

        assert_eq!(state.users.len().await, 11);
        assert_eq!(state.ranking.ledger_len().await.unwrap(), 11);

        let games = state.sessions.list().await;
        let ids: Vec<&str> = games.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["game1", "game2", "game3"]);

        let top = state.ranking.leaderboard(None, Some(1)).await.unwrap();
        assert_eq!(top[0].username, "ViperMaster");
        assert_eq!(top[0].score, 5000);
    }

    #[tokio::test]
    async fn test_seed_twice_is_stable() {
        let state = AppState::new(Arc::new(MemoryLedger::new()));
        seed(&state).await.unwrap();
        state.sessions.join("game1").await;

        seed(&state).await.unwrap();

        assert_eq!(state.users.len().await, 11);
        assert_eq!(state.ranking.ledger_len().await.unwrap(), 11);
        assert_eq!(state.sessions.get("game1").await.unwrap().viewer_count, 13);
    }

    #[tokio::test]
    async fn test_restart_with_file_ledger_keeps_one_copy_of_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");

        for _ in 0..3 {
            let state = AppState::new(Arc::new(FileLedger::open(&path).await.unwrap()));
            seed(&state).await.unwrap();

            assert_eq!(state.users.len().await, 11);
            assert_eq!(state.ranking.ledger_len().await.unwrap(), 11);
            assert!(state.users.login(DEMO_EMAIL, DEMO_PASSWORD).await.is_ok());
        }

        let state = AppState::new(Arc::new(FileLedger::open(&path).await.unwrap()));
        let top = state.ranking.leaderboard(None, Some(3)).await.unwrap();
        let names: Vec<(&str, u32)> = top
            .iter()
            .map(|e| (e.username.as_str(), e.score))
            .collect();
        assert_eq!(
            names,
            vec![("ViperMaster", 5000), ("PythonKing", 4500), ("Anaconda", 4000)]
        );
    }
}
