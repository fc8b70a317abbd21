//! Performance benchmarks for the ranking engine and session registry

use server::ledger::MemoryLedger;
use server::ranking::RankingEngine;
use server::sessions::SessionRegistry;
use shared::{GameMode, LiveSession};
use std::sync::Arc;
use std::time::Instant;

fn session(id: &str) -> LiveSession {
    LiveSession {
        id: id.to_string(),
        player_id: "bench".to_string(),
        player_name: "Bench".to_string(),
        current_score: 0,
        mode: GameMode::Walls,
        status: "playing".to_string(),
        started_at: chrono::Utc::now(),
        viewer_count: 0,
    }
}

/// Benchmarks score submission against a growing in-memory ledger
#[tokio::test]
async fn benchmark_score_submission() {
    let engine = RankingEngine::new(Arc::new(MemoryLedger::new()));

    let iterations = 5_000;
    let start = Instant::now();

    for i in 0..iterations {
        let score = (i * 7919) % 10_000;
        engine
            .submit("bench", "Bench", score, GameMode::Walls)
            .await
            .unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Score submission: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(engine.ledger_len().await.unwrap(), iterations as u64);
    // Linear scans over up to 5k records; generous bound for slow CI
    assert!(duration.as_secs() < 10);
}

/// Benchmarks leaderboard queries over a populated ledger
#[tokio::test]
async fn benchmark_leaderboard_query() {
    let engine = RankingEngine::new(Arc::new(MemoryLedger::new()));
    for i in 0..2_000u32 {
        let mode = if i % 2 == 0 {
            GameMode::Walls
        } else {
            GameMode::PassThrough
        };
        engine.submit("bench", "Bench", i, mode).await.unwrap();
    }

    let iterations = 500;
    let start = Instant::now();

    for _ in 0..iterations {
        let page = engine
            .leaderboard(Some(GameMode::Walls), Some(10))
            .await
            .unwrap();
        assert_eq!(page[0].score, 1998);
    }

    let duration = start.elapsed();
    println!(
        "Leaderboard query: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 10);
}

/// Benchmarks concurrent joins and leaves spread over many sessions
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn benchmark_concurrent_spectators() {
    let registry = Arc::new(SessionRegistry::new());
    let session_count = 16;
    for i in 0..session_count {
        registry.insert(session(&format!("game{}", i))).await;
    }

    let tasks = 8;
    let ops_per_task = 10_000;
    let start = Instant::now();

    let handles: Vec<_> = (0..tasks)
        .map(|t| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for op in 0..ops_per_task {
                    let id = format!("game{}", (t + op) % session_count);
                    registry.join(&id).await;
                    if op % 2 == 0 {
                        registry.leave(&id).await;
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let duration = start.elapsed();
    let total_ops = tasks * ops_per_task * 3 / 2;
    println!(
        "Spectator updates: {} ops in {:?} ({:.2} ns/op)",
        total_ops,
        duration,
        duration.as_nanos() as f64 / total_ops as f64
    );

    // Every task joins ops_per_task times and leaves half as often
    let total: u64 = registry.list().await.iter().map(|s| s.viewer_count).sum();
    assert_eq!(total, (tasks * ops_per_task / 2) as u64);
    assert!(duration.as_secs() < 10);
}
