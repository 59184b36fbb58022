//! Chess Rooms - Unified CLI
//!
//! Runs the room server, analyses positions, or plays engine self-play games.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use chess_rooms::{
    AppState, EngineConfig, EngineMetrics, GameService, LogSink, SessionState, SystemClock, router,
};
use clap::Parser;
use cli::{Cli, Command};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config);

    match cli.command {
        Command::Serve { port, host } => run_server(config, host, port).await,
        Command::Analyze { fen, json } => run_analyze(config, &fen, json),
        Command::Selfplay {
            white,
            black,
            max_plies,
            seed,
        } => {
            let config = match seed {
                Some(seed) => config.with_seed(seed),
                None => config,
            };
            run_selfplay(config, white, black, max_plies)
        }
    }
}

fn load_config(path: &Path) -> EngineConfig {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return EngineConfig::default();
    }
    match EngineConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            EngineConfig::default()
        }
    }
}

fn build_service(config: EngineConfig, metrics: EngineMetrics) -> GameService {
    GameService::new(config, Arc::new(LogSink), Arc::new(SystemClock), metrics)
}

/// Run the HTTP room server
#[instrument(skip(config))]
async fn run_server(config: EngineConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server().host().clone());
    let port = port.unwrap_or(*config.server().port());
    let config = config.with_server(host.clone(), port);

    let registry = prometheus::Registry::new();
    let metrics = EngineMetrics::new(&registry)?;
    let service = build_service(config, metrics);

    let cancel = CancellationToken::new();
    let tasks = service.spawn_maintenance(cancel.clone());

    let app = router(AppState {
        service: service.clone(),
        registry,
    });
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!(addr = %listener.local_addr()?, "Chess room server listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    for task in tasks {
        task.await.ok();
    }
    // Deliver whatever is still queued.
    if let Err(e) = service.events().flush() {
        warn!(error = %e, "Final event flush failed");
    }
    Ok(())
}

/// Print an evaluation report
fn run_analyze(config: EngineConfig, fen: &str, json: bool) -> Result<()> {
    let service = build_service(config, EngineMetrics::unregistered());
    let report = service.analyze(fen)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Let the engine play itself
#[instrument(skip(config))]
fn run_selfplay(
    config: EngineConfig,
    white: chess_rooms::Difficulty,
    black: chess_rooms::Difficulty,
    max_plies: u32,
) -> Result<()> {
    let service = build_service(config, EngineMetrics::unregistered());
    let id = service.create_selfplay_game(white, black)?;

    let mut moves = Vec::new();
    while moves.len() < max_plies as usize {
        match service.play_computer_turn(&id)? {
            Some(mv) => moves.push(mv.to_string()),
            None => break,
        }
    }
    service.events().flush().ok();

    let snapshot = service.snapshot(&id)?;
    println!("{}", moves.join(" "));
    println!("Final position: {}", snapshot.fen);
    match snapshot.state {
        SessionState::InProgress => println!("Stopped after {} plies", snapshot.ply),
        state => println!("Result: {state:?}"),
    }
    Ok(())
}
