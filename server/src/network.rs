//! Server network layer: UDP transport and request dispatch

use crate::auth::UserDirectory;
use crate::config::ServerConfig;
use crate::ledger::{self, Ledger};
use crate::ranking::RankingEngine;
use crate::seed;
use crate::sessions::SessionRegistry;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Messages sent from request handlers to the network sender task
#[derive(Debug)]
pub enum OutgoingMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Control messages for a running server
#[derive(Debug)]
pub enum ControlMessage {
    Shutdown,
}

/// Everything a request handler needs. Shared by all in-flight requests.
pub struct AppState {
    pub ranking: RankingEngine,
    pub sessions: SessionRegistry,
    pub users: UserDirectory,
}

impl AppState {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ranking: RankingEngine::new(ledger),
            sessions: SessionRegistry::new(),
            users: UserDirectory::new(),
        }
    }

    /// Turns one request packet into its response.
    ///
    /// Returns None for packets that are not requests. Identity is carried as
    /// the account email and resolved against the user directory before any
    /// call that acts on behalf of a player.
    pub async fn dispatch(&self, packet: Packet) -> Option<Packet> {
        let response = match packet {
            Packet::Signup {
                username,
                email,
                password,
            } => match self.users.create_user(&username, &email, &password).await {
                Ok(user) => Packet::Auth {
                    success: true,
                    user: Some(user),
                    error: None,
                },
                Err(e) => Packet::auth_failure(e.to_string()),
            },

            Packet::Login { email, password } => match self.users.login(&email, &password).await
            {
                Ok(user) => Packet::Auth {
                    success: true,
                    user: Some(user),
                    error: None,
                },
                Err(e) => Packet::auth_failure(e.to_string()),
            },

            Packet::Logout => Packet::LoggedOut,

            Packet::Me { email } => Packet::CurrentUser {
                user: self.users.find_by_email(&email).await,
            },

            Packet::GetLeaderboard { mode, limit } => {
                let limit = limit.map(|l| l as usize);
                match self.ranking.leaderboard(mode, limit).await {
                    Ok(entries) => Packet::Leaderboard { entries },
                    Err(e) => {
                        error!("Leaderboard query failed: {}", e);
                        Packet::Error {
                            reason: e.to_string(),
                        }
                    }
                }
            }

            Packet::SubmitScore { email, score, mode } => {
                let Some(user) = self.users.find_by_email(&email).await else {
                    return Some(Packet::Unauthorized);
                };
                match self
                    .ranking
                    .submit(&user.id, &user.username, score, mode)
                    .await
                {
                    Ok(outcome) => Packet::ScoreAccepted {
                        rank: outcome.rank,
                        is_high_score: outcome.is_high_score,
                    },
                    Err(e) => {
                        error!("Score submission for {} failed: {}", user.id, e);
                        Packet::Error {
                            reason: e.to_string(),
                        }
                    }
                }
            }

            Packet::ListGames => Packet::Games {
                games: self.sessions.list().await,
            },

            Packet::JoinGame { game_id } => {
                if self.sessions.join(&game_id).await {
                    Packet::Joined {
                        success: true,
                        error: None,
                    }
                } else {
                    Packet::Joined {
                        success: false,
                        error: Some("Game not found".to_string()),
                    }
                }
            }

            Packet::LeaveGame { game_id } => {
                self.sessions.leave(&game_id).await;
                Packet::Left
            }

            Packet::StartGame { email, mode } => {
                let Some(user) = self.users.find_by_email(&email).await else {
                    return Some(Packet::Unauthorized);
                };
                Packet::GameStarted {
                    game: self.sessions.start_game(&user, mode).await,
                }
            }

            Packet::EndGame { email, game_id } => {
                let Some(user) = self.users.find_by_email(&email).await else {
                    return Some(Packet::Unauthorized);
                };
                Packet::GameEnded {
                    success: self.sessions.remove_owned(&game_id, &user.id).await.is_some(),
                }
            }

            other => {
                warn!("Ignoring non-request packet {:?}", other);
                return None;
            }
        };

        Some(response)
    }
}

/// Swaps a response that cannot fit in one datagram for an error reply, so
/// the client gets an answer instead of waiting out its timeout.
fn fit_datagram(response: Packet) -> Packet {
    match bincode::serialized_size(&response) {
        Ok(size) if size <= MAX_DATAGRAM_SIZE as u64 => response,
        Ok(size) => {
            warn!(
                "Response of {} bytes exceeds the {} byte datagram limit",
                size, MAX_DATAGRAM_SIZE
            );
            Packet::Error {
                reason: format!(
                    "response too large: {} bytes exceeds the {} byte limit",
                    size, MAX_DATAGRAM_SIZE
                ),
            }
        }
        Err(e) => {
            error!("Failed to encode response: {}", e);
            Packet::Error {
                reason: format!("failed to encode response: {}", e),
            }
        }
    }
}

/// UDP front end for the arena. Each datagram carries one bincode-encoded
/// request and gets at most one response datagram back.
pub struct Server {
    socket: Arc<UdpSocket>,
    state: Arc<AppState>,

    // Communication channels
    outgoing_tx: mpsc::UnboundedSender<OutgoingMessage>,
    outgoing_rx: mpsc::UnboundedReceiver<OutgoingMessage>,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let ledger = ledger::open(&config.ledger, config.ledger_timeout).await?;
        let state = Arc::new(AppState::new(ledger));

        if config.seed {
            seed::seed(&state).await?;
        }

        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            state,
            outgoing_tx,
            outgoing_rx,
            control_tx,
            control_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Sender for stopping a running server from another task
    pub fn control(&self) -> mpsc::UnboundedSender<ControlMessage> {
        self.control_tx.clone()
    }

    /// Spawns task that processes the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut outgoing_rx = std::mem::replace(&mut self.outgoing_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                match message {
                    OutgoingMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Handles one request on its own task so slow ledger calls never hold up
    /// other requests
    fn spawn_request(&self, packet: Packet, addr: SocketAddr) {
        let state = Arc::clone(&self.state);
        let outgoing_tx = self.outgoing_tx.clone();

        tokio::spawn(async move {
            if let Some(response) = state.dispatch(packet).await {
                if let Err(e) = outgoing_tx.send(OutgoingMessage::SendPacket {
                    packet: fit_datagram(response),
                    addr,
                }) {
                    error!("Failed to queue response for {}: {}", addr, e);
                }
            }
        });
    }

    /// Main server loop: receive, decode, dispatch
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_sender();

        let socket = Arc::clone(&self.socket);
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        info!("Server started successfully");

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) if packet.is_request() => {
                                debug!("Request from {}: {:?}", addr, packet);
                                self.spawn_request(packet, addr);
                            }
                            Ok(packet) => {
                                warn!("Ignoring non-request packet from {}: {:?}", addr, packet)
                            }
                            Err(e) => warn!("Failed to deserialize packet from {}: {}", addr, e),
                        },
                        Err(e) => {
                            error!("Error receiving packet: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                message = self.control_rx.recv() => {
                    match message {
                        Some(ControlMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
