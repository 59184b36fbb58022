//! Command-line interface for chess_rooms.

use chess_rooms::Difficulty;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chess Rooms - turn-based chess session engine with a computer opponent
#[derive(Parser, Debug)]
#[command(name = "chess_rooms")]
#[command(about = "Chess game-room engine with a built-in computer opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "chess_rooms.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP room server
    Serve {
        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,
    },

    /// Print an evaluation report for a position
    Analyze {
        /// Position in FEN
        #[arg(long)]
        fen: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Let the computer play itself and print the game
    Selfplay {
        /// Difficulty playing White
        #[arg(long, default_value = "medium")]
        white: Difficulty,

        /// Difficulty playing Black
        #[arg(long, default_value = "medium")]
        black: Difficulty,

        /// Stop after this many half-moves
        #[arg(long, default_value = "200")]
        max_plies: u32,

        /// Seed for easy-tier move choice
        #[arg(long)]
        seed: Option<u64>,
    },
}
