use clap::{Parser, Subcommand};
use client::network::{ArenaClient, AuthOutcome};
use log::info;
use shared::{GameMode, User};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, env = "ARENA_SERVER", default_value = "127.0.0.1:8080")]
    server: String,

    /// How long to wait for each reply, in milliseconds
    #[arg(short = 't', long, default_value = "2000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Signup {
        username: String,
        email: String,
        password: String,
    },
    /// Check credentials
    Login { email: String, password: String },
    /// End the current session
    Logout,
    /// Look up the account behind an email
    Me { email: String },
    /// Show the top scores
    Leaderboard {
        #[arg(short, long)]
        mode: Option<GameMode>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Submit a finished game's score
    Submit {
        email: String,
        score: u32,
        #[arg(short, long, default_value = "walls")]
        mode: GameMode,
    },
    /// List games being played right now
    Games,
    /// Start watching a game
    Join { game_id: String },
    /// Stop watching a game
    Leave { game_id: String },
    /// Announce a new game
    Start {
        email: String,
        #[arg(short, long, default_value = "walls")]
        mode: GameMode,
    },
    /// Announce that one of your games is over
    End { email: String, game_id: String },
}

fn print_auth(outcome: AuthOutcome) {
    match outcome {
        AuthOutcome::Accepted(user) => print_user(&user),
        AuthOutcome::Rejected(reason) => println!("Rejected: {}", reason),
    }
}

fn print_user(user: &User) {
    println!(
        "{} <{}> id={} since {}",
        user.username,
        user.email,
        user.id,
        user.created_at.format("%Y-%m-%d")
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let client = ArenaClient::connect(&args.server, Duration::from_millis(args.timeout_ms)).await?;
    info!("Sending requests to {}", client.server_addr());

    match args.command {
        Command::Signup {
            username,
            email,
            password,
        } => print_auth(client.signup(&username, &email, &password).await?),
        Command::Login { email, password } => print_auth(client.login(&email, &password).await?),
        Command::Logout => {
            client.logout().await?;
            println!("Logged out");
        }
        Command::Me { email } => match client.me(&email).await? {
            Some(user) => print_user(&user),
            None => println!("No account for {}", email),
        },
        Command::Leaderboard { mode, limit } => {
            let entries = client.leaderboard(mode, limit).await?;
            println!(
                "{:>4}  {:<20} {:>8}  {:<13} {}",
                "RANK", "PLAYER", "SCORE", "MODE", "DATE"
            );
            for entry in entries {
                println!(
                    "{:>4}  {:<20} {:>8}  {:<13} {}",
                    entry.rank, entry.username, entry.score, entry.mode, entry.date
                );
            }
        }
        Command::Submit { email, score, mode } => {
            let (rank, is_high_score) = client.submit_score(&email, score, mode).await?;
            if is_high_score {
                println!("Rank #{} - new high score!", rank);
            } else {
                println!("Rank #{}", rank);
            }
        }
        Command::Games => {
            let games = client.list_games().await?;
            if games.is_empty() {
                println!("No live games");
            }
            for game in games {
                println!(
                    "{}  {:<16} {:>6} pts  {:<13} {:<8} {} watching",
                    game.id,
                    game.player_name,
                    game.current_score,
                    game.mode,
                    game.status,
                    game.viewer_count
                );
            }
        }
        Command::Join { game_id } => {
            client.join_game(&game_id).await?;
            println!("Watching {}", game_id);
        }
        Command::Leave { game_id } => {
            client.leave_game(&game_id).await?;
            println!("Left {}", game_id);
        }
        Command::Start { email, mode } => {
            let game = client.start_game(&email, mode).await?;
            println!("Started game {} ({})", game.id, game.mode);
        }
        Command::End { email, game_id } => {
            if client.end_game(&email, &game_id).await? {
                println!("Ended game {}", game_id);
            } else {
                println!("No game {} owned by {}", game_id, email);
            }
        }
    }

    Ok(())
}
