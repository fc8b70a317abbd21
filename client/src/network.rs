use bincode::{deserialize, serialize};
use log::{debug, warn};
use shared::{GameMode, LeaderboardEntry, LiveSession, Packet, User, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid server address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to encode or decode packet: {0}")]
    Codec(#[from] bincode::Error),

    #[error("no response from server within {0:?}")]
    Timeout(Duration),

    #[error("not authorized")]
    Unauthorized,

    #[error("{0}")]
    Rejected(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("unexpected response: {0:?}")]
    Unexpected(Box<Packet>),
}

/// Result of a signup or login attempt
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Accepted(User),
    Rejected(String),
}

pub struct ArenaClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    reply_timeout: Duration,
}

impl ArenaClient {
    pub async fn connect(server_addr: &str, reply_timeout: Duration) -> Result<Self, ClientError> {
        let server_addr: SocketAddr = server_addr.parse()?;
        let bind_addr = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;

        Ok(ArenaClient {
            socket,
            server_addr,
            reply_timeout,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Sends one request and waits for its reply.
    ///
    /// Datagrams from anyone other than the server are skipped, as is anything
    /// already queued before the request went out (such as a late reply to an
    /// earlier request that timed out).
    pub async fn request(&self, packet: &Packet) -> Result<Packet, ClientError> {
        let data = serialize(packet)?;
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        while let Ok((_, addr)) = self.socket.try_recv_from(&mut buffer) {
            debug!("Discarding stale datagram from {}", addr);
        }
        self.socket.send_to(&data, self.server_addr).await?;

        let reply = timeout(self.reply_timeout, async {
            loop {
                let (len, addr) = self.socket.recv_from(&mut buffer).await?;
                if addr != self.server_addr {
                    warn!("Ignoring datagram from unexpected peer {}", addr);
                    continue;
                }
                return Ok::<_, ClientError>(deserialize::<Packet>(&buffer[..len])?);
            }
        })
        .await
        .map_err(|_| ClientError::Timeout(self.reply_timeout))??;

        debug!("Reply from {}: {:?}", self.server_addr, reply);
        match reply {
            Packet::Unauthorized => Err(ClientError::Unauthorized),
            Packet::Error { reason } => Err(ClientError::Server(reason)),
            other => Ok(other),
        }
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, ClientError> {
        let reply = self
            .request(&Packet::Signup {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        auth_outcome(reply)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, ClientError> {
        let reply = self
            .request(&Packet::Login {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        auth_outcome(reply)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        match self.request(&Packet::Logout).await? {
            Packet::LoggedOut => Ok(()),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn me(&self, email: &str) -> Result<Option<User>, ClientError> {
        match self
            .request(&Packet::Me {
                email: email.to_string(),
            })
            .await?
        {
            Packet::CurrentUser { user } => Ok(user),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn leaderboard(
        &self,
        mode: Option<GameMode>,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntry>, ClientError> {
        match self.request(&Packet::GetLeaderboard { mode, limit }).await? {
            Packet::Leaderboard { entries } => Ok(entries),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    /// Submits a finished game's score. Returns (rank, is_high_score).
    pub async fn submit_score(
        &self,
        email: &str,
        score: u32,
        mode: GameMode,
    ) -> Result<(u64, bool), ClientError> {
        match self
            .request(&Packet::SubmitScore {
                email: email.to_string(),
                score,
                mode,
            })
            .await?
        {
            Packet::ScoreAccepted {
                rank,
                is_high_score,
            } => Ok((rank, is_high_score)),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn list_games(&self) -> Result<Vec<LiveSession>, ClientError> {
        match self.request(&Packet::ListGames).await? {
            Packet::Games { games } => Ok(games),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    /// Starts watching a game. A game that does not exist is reported as
    /// `ClientError::Rejected`.
    pub async fn join_game(&self, game_id: &str) -> Result<(), ClientError> {
        match self
            .request(&Packet::JoinGame {
                game_id: game_id.to_string(),
            })
            .await?
        {
            Packet::Joined { success: true, .. } => Ok(()),
            Packet::Joined {
                success: false,
                error,
            } => Err(ClientError::Rejected(
                error.unwrap_or_else(|| "Game not found".to_string()),
            )),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn leave_game(&self, game_id: &str) -> Result<(), ClientError> {
        match self
            .request(&Packet::LeaveGame {
                game_id: game_id.to_string(),
            })
            .await?
        {
            Packet::Left => Ok(()),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    pub async fn start_game(
        &self,
        email: &str,
        mode: GameMode,
    ) -> Result<LiveSession, ClientError> {
        match self
            .request(&Packet::StartGame {
                email: email.to_string(),
                mode,
            })
            .await?
        {
            Packet::GameStarted { game } => Ok(game),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }

    /// Ends one of the caller's own games. Returns false if the game was not
    /// found or belongs to someone else.
    pub async fn end_game(&self, email: &str, game_id: &str) -> Result<bool, ClientError> {
        match self
            .request(&Packet::EndGame {
                email: email.to_string(),
                game_id: game_id.to_string(),
            })
            .await?
        {
            Packet::GameEnded { success } => Ok(success),
            other => Err(ClientError::Unexpected(Box::new(other))),
        }
    }
}

fn auth_outcome(reply: Packet) -> Result<AuthOutcome, ClientError> {
    match reply {
        Packet::Auth {
            success: true,
            user: Some(user),
            ..
        } => Ok(AuthOutcome::Accepted(user)),
        Packet::Auth { error, .. } => Ok(AuthOutcome::Rejected(
            error.unwrap_or_else(|| "Authentication failed".to_string()),
        )),
        other => Err(ClientError::Unexpected(Box::new(other))),
    }
}
