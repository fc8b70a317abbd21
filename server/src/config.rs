//! Runtime configuration for the arena server

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which ledger implementation backs the ranking engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub ledger: LedgerBackend,
    /// Upper bound on any single ledger call
    pub ledger_timeout: Duration,
    /// Load demo users, scores and live games at startup
    pub seed: bool,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ledger: LedgerBackend::Memory,
            ledger_timeout: Duration::from_secs(5),
            seed: false,
        }
    }

    pub fn with_ledger(mut self, ledger: LedgerBackend) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_ledger_timeout(mut self, ledger_timeout: Duration) -> Self {
        self.ledger_timeout = ledger_timeout;
        self
    }

    pub fn with_seed(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }
}
