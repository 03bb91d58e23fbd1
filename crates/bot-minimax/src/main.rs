//! Minimax bot with alpha-beta pruning.
//!
//! A UCI engine built on the bitboard move generator: iterative deepening,
//! a transposition table, and a material + piece-square evaluation.
//! Protocol traffic uses stdout; logs go to stderr, filtered by `RUST_LOG`.

mod config;
mod engine;
mod eval;
mod search;
mod tt;

use anyhow::Context;
use clap::Parser;
use config::EngineConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// UCI chess engine using alpha-beta search.
#[derive(Parser)]
#[command(name = "bot-minimax")]
#[command(about = "UCI chess engine using alpha-beta search")]
struct Args {
    /// Path to the engine configuration file
    #[arg(long, default_value = "engine.toml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let config = EngineConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    tracing::info!(?config, "starting {}", config.name);

    chess_engine::init();
    let mut uci = uci::stdio_engine();
    engine::run(&mut uci, config)?;

    tracing::info!("shutting down");
    Ok(())
}
