//! # Arena Server Library
//!
//! This library provides the server side of the arcade arena: it records every
//! finished game's score, ranks it against all historical scores, and keeps
//! track of the games currently being played and how many spectators are
//! watching each one.
//!
//! ## Core Responsibilities
//!
//! ### Ranking
//! Every score submission is ranked and then appended to an append-only
//! ledger. The rank returned to the player is a *counting rank*: one plus the
//! number of recorded scores strictly greater than theirs. A submission ranked
//! 10th or better is a high score.
//!
//! ### Live Sessions
//! Games in progress are held in memory together with a spectator count.
//! Spectators join and leave freely; leaving a game that has already ended is
//! not an error.
//!
//! ### Request Dispatch
//! Clients talk to the server over UDP. Each datagram carries one request
//! packet, is handled on its own task, and is answered with one response
//! packet.
//!
//! ## Architecture Design
//!
//! ### Concurrent Request Handling
//! Unlike a tick-driven game loop, requests here are independent: each one is
//! spawned as its own tokio task, so many submissions, joins and leaves are in
//! flight at once.
//!
//! ### Advisory Ranks
//! A submission counts higher scores and then appends, as two separate ledger
//! calls. Two submissions racing each other may report overlapping ranks. The
//! append itself is always atomic.
//!
//! ### Lock-Light Spectator Counts
//! The session map is only write-locked to add or remove a game. Joins and
//! leaves take a shared read lock and update an atomic counter on the session,
//! so updates are never lost and different games never contend.
//!
//! ## Module Organization
//!
//! ### Ledger Module (`ledger`)
//! The score store behind a single async trait:
//! - In-memory backend for tests and demos
//! - JSON-lines file backend that survives restarts
//! - Timeout guard applied to whichever backend is configured
//!
//! ### Ranking Module (`ranking`)
//! Score submission with counting ranks and page-ranked leaderboards.
//!
//! ### Sessions Module (`sessions`)
//! The live session registry: list, join, leave, and the hooks games use to
//! register and unregister themselves.
//!
//! ### Auth Module (`auth`)
//! In-memory user directory used to resolve who is making a request.
//!
//! ### Network Module (`network`)
//! UDP socket handling, packet (de)serialization and request dispatch.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{LedgerBackend, ServerConfig};
//! use server::network::Server;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("127.0.0.1:8080".parse()?)
//!         .with_ledger(LedgerBackend::File(PathBuf::from("data/scores.jsonl")))
//!         .with_seed(true);
//!
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod network;
pub mod ranking;
pub mod seed;
pub mod sessions;
