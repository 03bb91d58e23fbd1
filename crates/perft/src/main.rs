//! Perft driver.
//!
//! Counts the leaf nodes of the legal move tree from a position, optionally
//! split per root move, and reports the elapsed time.

use anyhow::Context;
use chess_core::FenParser;
use chess_engine::movegen::perft::{perft, perft_divide, perft_parallel};
use chess_engine::Position;
use clap::Parser;
use std::io::Write;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Counts legal move paths to a fixed depth.
#[derive(Parser, Debug)]
#[command(name = "perft")]
#[command(about = "Counts legal move paths to a fixed depth")]
struct Args {
    /// Position to count from
    #[arg(long, default_value = FenParser::STARTPOS)]
    fen: String,

    /// Print the count below each root move
    #[arg(long)]
    divide: bool,

    /// Split root moves across threads
    #[arg(long, conflicts_with = "divide")]
    parallel: bool,

    /// Depth in plies
    depth: u32,
}

fn run(args: &Args, out: &mut impl Write) -> anyhow::Result<u64> {
    let mut position =
        Position::from_fen(&args.fen).with_context(|| format!("invalid FEN '{}'", args.fen))?;
    tracing::debug!(fen = %args.fen, depth = args.depth, "counting");

    let start = Instant::now();
    let nodes = if args.divide {
        let divide = perft_divide(&mut position, args.depth);
        for (m, count) in &divide {
            writeln!(out, "{}: {}", m, count)?;
        }
        writeln!(out)?;
        if args.depth == 0 {
            1
        } else {
            divide.iter().map(|(_, n)| n).sum()
        }
    } else if args.parallel {
        perft_parallel(&position, args.depth)
    } else {
        perft(&mut position, args.depth)
    };
    let elapsed = start.elapsed();

    let nps = (nodes as f64 / elapsed.as_secs_f64().max(1e-6)) as u64;
    writeln!(out, "Nodes: {}", nodes)?;
    writeln!(out, "Time: {} ms", elapsed.as_millis())?;
    writeln!(out, "NPS: {}", nps)?;
    Ok(nodes)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    chess_engine::init();
    let stdout = std::io::stdout();
    run(&args, &mut stdout.lock())?;
    Ok(())
}
