//! # Arena Client Library
//!
//! A thin client for the arena server. It speaks the same bincode-over-UDP
//! protocol as the server: one request packet per datagram, one reply packet
//! back.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - [`network::ArenaClient`] owns an ephemeral UDP socket and the server
//!   address, sends requests and waits for replies with a timeout
//! - Typed helpers for every request (accounts, leaderboard, score
//!   submission, live games)
//! - [`network::ClientError`] separates transport failures, rejected requests
//!   and server-side errors
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::ArenaClient;
//! use shared::GameMode;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ArenaClient::connect("127.0.0.1:8080", Duration::from_secs(2)).await?;
//!
//!     let (rank, is_high_score) = client
//!         .submit_score("demo@snake.io", 1200, GameMode::Walls)
//!         .await?;
//!     println!("Rank {} (high score: {})", rank, is_high_score);
//!
//!     for game in client.list_games().await? {
//!         println!("{} is watched by {}", game.player_name, game.viewer_count);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod network;
