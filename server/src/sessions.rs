//! Live game sessions and their spectator counts
//!
//! The registry owns every session that is currently being played. Games are
//! added and removed by whoever runs them (the `StartGame`/`EndGame` requests
//! and the demo seeder); the registry itself only ever changes viewer counts.
//!
//! The map sits behind a `RwLock`, but `join` and `leave` only need the shared
//! read guard: each session keeps its viewer count in an `AtomicU64`. Updates to
//! the same session are atomic and updates to different sessions never wait on
//! each other.

use chrono::{DateTime, Utc};
use log::{debug, info};
use shared::{GameMode, LiveSession, User};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One registered session. Everything except the viewer count is fixed when
/// the game starts.
#[derive(Debug)]
struct SessionSlot {
    id: String,
    player_id: String,
    player_name: String,
    current_score: u32,
    mode: GameMode,
    status: String,
    started_at: DateTime<Utc>,
    viewers: AtomicU64,
}

impl SessionSlot {
    fn from_session(session: LiveSession) -> Self {
        Self {
            id: session.id,
            player_id: session.player_id,
            player_name: session.player_name,
            current_score: session.current_score,
            mode: session.mode,
            status: session.status,
            started_at: session.started_at,
            viewers: AtomicU64::new(session.viewer_count),
        }
    }

    fn snapshot(&self) -> LiveSession {
        LiveSession {
            id: self.id.clone(),
            player_id: self.player_id.clone(),
            player_name: self.player_name.clone(),
            current_score: self.current_score,
            mode: self.mode,
            status: self.status.clone(),
            started_at: self.started_at,
            viewer_count: self.viewers.load(Ordering::Acquire),
        }
    }

    fn add_viewer(&self) -> u64 {
        self.viewers.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements without going below zero
    fn remove_viewer(&self) -> u64 {
        match self
            .viewers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => 0,
        }
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all live sessions, oldest first.
    ///
    /// Sessions started or joined after this returns are not reflected.
    pub async fn list(&self) -> Vec<LiveSession> {
        let sessions = self.sessions.read().await;
        let mut snapshot: Vec<LiveSession> = sessions.values().map(|s| s.snapshot()).collect();
        snapshot.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        snapshot
    }

    pub async fn get(&self, session_id: &str) -> Option<LiveSession> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|s| s.snapshot())
    }

    /// Adds one spectator. Returns false if no such session exists.
    pub async fn join(&self, session_id: &str) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(slot) => {
                let viewers = slot.add_viewer();
                debug!("Viewer joined {} ({} watching)", session_id, viewers);
                true
            }
            None => {
                debug!("Join for unknown session {}", session_id);
                false
            }
        }
    }

    /// Removes one spectator, never going below zero. Unknown ids are ignored
    /// since a game can end before its spectators leave.
    pub async fn leave(&self, session_id: &str) {
        let sessions = self.sessions.read().await;
        if let Some(slot) = sessions.get(session_id) {
            let viewers = slot.remove_viewer();
            debug!("Viewer left {} ({} watching)", session_id, viewers);
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Registers a session on behalf of the game that owns it. A session with
    /// the same id is replaced.
    pub async fn insert(&self, session: LiveSession) {
        let slot = Arc::new(SessionSlot::from_session(session));
        info!(
            "Live session {} registered for {} ({})",
            slot.id, slot.player_name, slot.mode
        );
        self.sessions.write().await.insert(slot.id.clone(), slot);
    }

    /// Unregisters a session only if `player_id` is the one playing it.
    pub async fn remove_owned(&self, session_id: &str, player_id: &str) -> Option<LiveSession> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(slot) if slot.player_id == player_id => {}
            _ => return None,
        }
        let slot = sessions.remove(session_id)?;
        info!("Live session {} ended by {}", session_id, slot.player_name);
        Some(slot.snapshot())
    }

    /// Starts a fresh session for `player` and registers it.
    pub async fn start_game(&self, player: &User, mode: GameMode) -> LiveSession {
        let session = LiveSession {
            id: Uuid::new_v4().to_string(),
            player_id: player.id.clone(),
            player_name: player.username.clone(),
            current_score: 0,
            mode,
            status: "playing".to_string(),
            started_at: Utc::now(),
            viewer_count: 0,
        };
        self.insert(session.clone()).await;
        session
    }
}
