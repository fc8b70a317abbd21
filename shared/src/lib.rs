use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const HIGH_SCORE_THRESHOLD: u64 = 10;
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    #[serde(rename = "walls")]
    Walls,
    #[serde(rename = "pass-through")]
    PassThrough,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Walls => "walls",
            GameMode::PassThrough => "pass-through",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walls" => Ok(GameMode::Walls),
            "pass-through" | "pass_through" => Ok(GameMode::PassThrough),
            other => Err(format!("unknown game mode '{}'", other)),
        }
    }
}

/// One submitted score. Immutable once appended to the ledger.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub id: String,
    pub user_id: String,
    /// Username as it was when the score was submitted.
    pub username: String,
    pub score: u32,
    pub mode: GameMode,
    pub date: NaiveDate,
}

impl ScoreRecord {
    pub fn new(
        id: String,
        user_id: &str,
        username: &str,
        score: u32,
        mode: GameMode,
        date: NaiveDate,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            score,
            mode,
            date,
        }
    }

    pub fn matches(&self, mode: Option<GameMode>) -> bool {
        mode.map_or(true, |m| self.mode == m)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub id: String,
    pub rank: u64,
    pub user_id: String,
    pub username: String,
    pub score: u32,
    pub mode: GameMode,
    pub date: NaiveDate,
}

impl LeaderboardEntry {
    pub fn from_record(record: ScoreRecord, rank: u64) -> Self {
        Self {
            id: record.id,
            rank,
            user_id: record.user_id,
            username: record.username,
            score: record.score,
            mode: record.mode,
            date: record.date,
        }
    }
}

/// Snapshot of a game currently being played.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LiveSession {
    pub id: String,
    pub player_id: String,
    pub player_name: String,
    pub current_score: u32,
    pub mode: GameMode,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub viewer_count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Signup {
        username: String,
        email: String,
        password: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    Me {
        email: String,
    },
    GetLeaderboard {
        mode: Option<GameMode>,
        limit: Option<u32>,
    },
    SubmitScore {
        email: String,
        score: u32,
        mode: GameMode,
    },
    ListGames,
    JoinGame {
        game_id: String,
    },
    LeaveGame {
        game_id: String,
    },
    StartGame {
        email: String,
        mode: GameMode,
    },
    EndGame {
        email: String,
        game_id: String,
    },

    Auth {
        success: bool,
        user: Option<User>,
        error: Option<String>,
    },
    LoggedOut,
    CurrentUser {
        user: Option<User>,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    ScoreAccepted {
        rank: u64,
        is_high_score: bool,
    },
    Games {
        games: Vec<LiveSession>,
    },
    Joined {
        success: bool,
        error: Option<String>,
    },
    Left,
    GameStarted {
        game: LiveSession,
    },
    GameEnded {
        success: bool,
    },
    Unauthorized,
    Error {
        reason: String,
    },
}

impl Packet {
    /// True for packets a client sends to the server.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Packet::Signup { .. }
                | Packet::Login { .. }
                | Packet::Logout
                | Packet::Me { .. }
                | Packet::GetLeaderboard { .. }
                | Packet::SubmitScore { .. }
                | Packet::ListGames
                | Packet::JoinGame { .. }
                | Packet::LeaveGame { .. }
                | Packet::StartGame { .. }
                | Packet::EndGame { .. }
        )
    }

    pub fn auth_failure(reason: impl Into<String>) -> Self {
        Packet::Auth {
            success: false,
            user: None,
            error: Some(reason.into()),
        }
    }
}

pub fn is_high_score(rank: u64) -> bool {
    rank <= HIGH_SCORE_THRESHOLD
}
