//! UCI command loop.
//!
//! The main thread owns the position and answers commands; `go` hands a copy
//! of the position to a worker thread that reports through a cloned
//! [`UciSender`] and watches a shared stop flag.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chess_engine::movegen::perft::perft_divide;
use chess_engine::{parse_move, Position};
use tracing::{debug, error, info, warn};
use uci::{GoOptions, GuiCommand, OptionKind, UciEngine, UciError, UciSender};

use crate::config::{EngineConfig, HASH_MB_RANGE};
use crate::search::{SearchLimits, Searcher};
use crate::tt::TranspositionTable;

const AUTHOR: &str = "Chess Devtools";

pub struct Engine<W: Write + Send + 'static> {
    config: EngineConfig,
    sender: UciSender<W>,
    position: Position,
    /// Keys of the positions before `position` in the current game.
    history: Vec<u64>,
    tt: Arc<TranspositionTable>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    /// The running search was started with `go infinite`.
    infinite: bool,
}

impl<W: Write + Send + 'static> Engine<W> {
    pub fn new(config: EngineConfig, sender: UciSender<W>) -> Self {
        let tt = Arc::new(TranspositionTable::new(config.hash_mb));
        Self {
            config,
            sender,
            position: Position::startpos(),
            history: Vec::new(),
            tt,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            infinite: false,
        }
    }

    /// Handles one command. Returns `Ok(false)` once the GUI asked to quit.
    pub fn handle(&mut self, command: GuiCommand) -> Result<bool, UciError> {
        debug!(?command, "received");
        match command {
            GuiCommand::Uci => {
                self.sender.send_id(&self.config.name, AUTHOR)?;
                let (min, max) = HASH_MB_RANGE;
                self.sender.send_option(
                    "Hash",
                    OptionKind::Spin {
                        default: self.config.hash_mb as i64,
                        min: min as i64,
                        max: max as i64,
                    },
                )?;
                self.sender.send_option("Clear Hash", OptionKind::Button)?;
                self.sender.send_uciok()?;
            }
            GuiCommand::IsReady => self.sender.send_readyok()?,
            GuiCommand::UciNewGame => {
                self.stop_search();
                self.tt.clear();
                self.position = Position::startpos();
                self.history.clear();
            }
            GuiCommand::SetOption { name, value } => self.set_option(&name, value.as_deref())?,
            GuiCommand::Position { fen, moves } => self.set_position(fen.as_deref(), &moves)?,
            GuiCommand::Go(opts) => self.go(opts)?,
            GuiCommand::Stop => self.stop_search(),
            GuiCommand::Quit => {
                self.stop_search();
                return Ok(false);
            }
            GuiCommand::Unknown(line) => {
                if !line.is_empty() {
                    self.sender.send_string(&format!("unknown command: {}", line))?;
                }
            }
        }
        Ok(true)
    }

    fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<(), UciError> {
        match name.to_ascii_lowercase().as_str() {
            "hash" => {
                let (min, max) = HASH_MB_RANGE;
                match value.and_then(|v| v.trim().parse::<usize>().ok()) {
                    Some(mb) if (min..=max).contains(&mb) => {
                        self.stop_search();
                        self.tt.resize(mb);
                        self.config.hash_mb = mb;
                        info!(mb, slots = self.tt.capacity(), "transposition table resized");
                    }
                    _ => {
                        self.sender.send_string(&format!(
                            "Hash must be between {} and {} MB, got '{}'",
                            min,
                            max,
                            value.unwrap_or("")
                        ))?;
                    }
                }
            }
            "clear hash" => {
                self.stop_search();
                self.tt.clear();
            }
            _ => self.sender.send_string(&format!("unknown option: {}", name))?,
        }
        Ok(())
    }

    /// Loads a position and replays `moves`.
    ///
    /// A bad FEN leaves the current position untouched. Replay stops at the
    /// first move that is not legal, keeping the moves before it.
    fn set_position(&mut self, fen: Option<&str>, moves: &[String]) -> Result<(), UciError> {
        let mut position = match fen {
            None => Position::startpos(),
            Some(fen) => match Position::from_fen(fen) {
                Ok(position) => position,
                Err(e) => {
                    warn!(fen, error = %e, "rejected position");
                    return self.sender.send_string(&format!("invalid fen: {}", e));
                }
            },
        };

        let mut history = Vec::with_capacity(moves.len());
        for text in moves {
            let key = position.zobrist_hash();
            let applied = parse_move(&position, text)
                .map_err(|e| e.to_string())
                .and_then(|m| position.play(m).map_err(|e| e.to_string()));
            match applied {
                Ok(_) => history.push(key),
                Err(e) => {
                    warn!(text = text.as_str(), error = %e, "move replay stopped");
                    self.sender
                        .send_string(&format!("stopping move replay at {}: {}", text, e))?;
                    break;
                }
            }
        }

        self.position = position;
        self.history = history;
        Ok(())
    }

    fn go(&mut self, opts: GoOptions) -> Result<(), UciError> {
        self.stop_search();
        if let Some(depth) = opts.perft {
            return self.perft(depth);
        }

        let limits = SearchLimits::from_go(&opts, self.position.side_to_move, &self.config);
        info!(depth = limits.depth, time = ?limits.time, "search started");

        self.stop.store(false, Ordering::SeqCst);
        let tt = Arc::clone(&self.tt);
        let stop = Arc::clone(&self.stop);
        let sender = self.sender.clone();
        let position = self.position;
        let history = self.history.clone();
        let infinite = opts.infinite;
        self.infinite = infinite;

        self.worker = Some(thread::spawn(move || {
            let result = Searcher::new(&tt, &stop, limits)
                .with_history(history)
                .search(&position, |info| {
                    if let Err(e) = sender.send_info(info) {
                        warn!(error = %e, "failed to send info");
                    }
                });
            info!(depth = result.depth, nodes = result.nodes, "search finished");

            // `go infinite` may only answer once told to stop.
            while infinite && !stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }

            let best = result.best_move.map_or_else(|| "0000".to_string(), |m| m.to_uci());
            if let Err(e) = sender.send_bestmove(&best) {
                error!(error = %e, "failed to send bestmove");
            }
        }));
        Ok(())
    }

    fn perft(&mut self, depth: u32) -> Result<(), UciError> {
        let start = Instant::now();
        let mut position = self.position;
        let divide = perft_divide(&mut position, depth);
        let nodes: u64 = if depth == 0 {
            1
        } else {
            divide.iter().map(|(_, n)| n).sum()
        };

        for (m, count) in &divide {
            self.sender.send_string(&format!("{}: {}", m, count))?;
        }
        self.sender.send_string(&format!(
            "perft {} nodes {} time {}",
            depth,
            nodes,
            start.elapsed().as_millis()
        ))
    }

    /// Raises the stop flag and waits for the search to send its bestmove.
    pub fn stop_search(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.join_worker();
    }

    /// Waits for a running search to end on its own limits. An infinite
    /// search has none, so it is stopped instead.
    pub fn finish_search(&mut self) {
        if self.infinite {
            self.stop.store(true, Ordering::SeqCst);
        }
        self.join_worker();
    }

    fn join_worker(&mut self) {
        self.infinite = false;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("search thread panicked");
            }
        }
    }
}

impl<W: Write + Send + 'static> Drop for Engine<W> {
    fn drop(&mut self) {
        self.stop_search();
    }
}

/// Reads commands until `quit` or end of input.
///
/// Lines that fail to parse are answered with `info string` and skipped.
/// At end of input a running search is allowed to finish, unless it is an
/// infinite one.
pub fn run<R: BufRead, W: Write + Send + 'static>(
    uci: &mut UciEngine<R, W>,
    config: EngineConfig,
) -> Result<(), UciError> {
    let mut engine = Engine::new(config, uci.sender().clone());

    loop {
        match uci.read_command() {
            Ok(Some(command)) => {
                if !engine.handle(command)? {
                    break;
                }
            }
            Ok(None) => {
                debug!("end of input");
                engine.finish_search();
                break;
            }
            Err(UciError::ParseError(msg)) => {
                warn!(%msg, "malformed command");
                uci.sender().send_string(&msg)?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
