use clap::{Parser, ValueEnum};
use log::info;
use server::config::{LedgerBackend, ServerConfig};
use server::network::Server;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LedgerKind {
    Memory,
    File,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, env = "ARENA_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, env = "ARENA_PORT", default_value = "8080")]
    port: u16,

    /// Score ledger backend
    #[arg(short, long, env = "ARENA_LEDGER", value_enum, default_value = "memory")]
    ledger: LedgerKind,

    /// Ledger file used by the file backend
    #[arg(long, env = "ARENA_LEDGER_PATH", default_value = "data/scores.jsonl")]
    ledger_path: PathBuf,

    /// Maximum time any single ledger call may take, in milliseconds
    #[arg(long, env = "ARENA_LEDGER_TIMEOUT_MS", default_value = "5000")]
    ledger_timeout_ms: u64,

    /// Load demo users, scores and live games at startup
    #[arg(long, env = "ARENA_SEED")]
    seed: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let bind_addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;
        let ledger = match self.ledger {
            LedgerKind::Memory => LedgerBackend::Memory,
            LedgerKind::File => LedgerBackend::File(self.ledger_path),
        };

        Ok(ServerConfig::new(bind_addr)
            .with_ledger(ledger)
            .with_ledger_timeout(Duration::from_millis(self.ledger_timeout_ms))
            .with_seed(self.seed))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = args.into_config()?;

    info!("Starting arena server...");
    info!("Ledger backend: {:?}", config.ledger);

    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
