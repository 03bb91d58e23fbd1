//! Iterative-deepening negamax with alpha-beta pruning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chess_core::{Color, Move, Piece};
use chess_engine::{generate_legal_moves, in_check, Position};
use tracing::debug;
use uci::{EngineInfo, GoOptions, InfoBuilder, Score};

use crate::config::EngineConfig;
use crate::eval::{evaluate, PIECE_VALUES};
use crate::tt::{Bound, TranspositionTable, TtEntry};

/// Score of delivering mate at the root; mates further away score lower.
pub const MATE: i32 = 100_000;
pub const MAX_DEPTH: u32 = 64;

const INFINITY: i32 = MATE + 1;
/// Scores beyond this are mate scores.
const MATE_BOUND: i32 = MATE - 2 * MAX_DEPTH as i32;
/// Nodes between clock reads.
const TIME_CHECK_INTERVAL: u64 = 2048;

/// How far and how long to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: u32,
    pub time: Option<Duration>,
}

impl SearchLimits {
    /// Derives limits from a `go` command for the side to move.
    ///
    /// `movetime` wins over clock times. With a clock, the budget is an even
    /// share of the remaining time plus most of the increment. A `go` without
    /// any limit falls back to the configured defaults.
    pub fn from_go(opts: &GoOptions, side: Color, config: &EngineConfig) -> Self {
        let budget = |ms: u64| Duration::from_millis(ms.saturating_sub(config.move_overhead_ms).max(1));

        if opts.infinite {
            return Self {
                depth: opts.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH),
                time: None,
            };
        }

        let (remaining, increment) = match side {
            Color::White => (opts.wtime, opts.winc),
            Color::Black => (opts.btime, opts.binc),
        };
        let time = match (opts.movetime, remaining) {
            (Some(movetime), _) => Some(budget(movetime)),
            (None, Some(remaining)) => {
                let moves_to_go = u64::from(opts.movestogo.unwrap_or(30).max(1));
                let share = remaining / moves_to_go + increment.unwrap_or(0) * 3 / 4;
                Some(budget(share.min(remaining)))
            }
            (None, None) => None,
        };

        match (opts.depth, time) {
            (Some(depth), time) => Self {
                depth: depth.clamp(1, MAX_DEPTH),
                time,
            },
            (None, Some(time)) => Self {
                depth: MAX_DEPTH,
                time: Some(time),
            },
            (None, None) => Self {
                depth: config.default_depth.clamp(1, MAX_DEPTH),
                time: (config.default_movetime_ms > 0).then(|| budget(config.default_movetime_ms)),
            },
        }
    }
}

/// Outcome of the deepest completed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// `None` only when the root has no legal moves.
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
}

/// Converts a search score to its UCI form.
pub fn uci_score(score: i32) -> Score {
    if score >= MATE_BOUND {
        Score::Mate((MATE - score + 1) / 2)
    } else if score <= -MATE_BOUND {
        Score::Mate(-(MATE + score) / 2)
    } else {
        Score::Cp(score)
    }
}

// Mate scores are stored relative to the node, not the root.
fn score_to_tt(score: i32, ply: u32) -> i32 {
    if score >= MATE_BOUND {
        score + ply as i32
    } else if score <= -MATE_BOUND {
        score - ply as i32
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: u32) -> i32 {
    if score >= MATE_BOUND {
        score - ply as i32
    } else if score <= -MATE_BOUND {
        score + ply as i32
    } else {
        score
    }
}

fn move_priority(position: &Position, m: Move, hash_move: Option<Move>) -> i32 {
    if hash_move == Some(m) {
        return i32::MAX;
    }
    let mut priority = 0;
    if m.is_capture() {
        let victim = if m.is_en_passant() {
            Piece::Pawn
        } else {
            position.piece_at(m.to()).map_or(Piece::Pawn, |(piece, _)| piece)
        };
        // Most valuable victim, least valuable attacker.
        priority += 10_000 + 10 * PIECE_VALUES[victim.index()] - PIECE_VALUES[m.piece().index()];
    }
    if let Some(promotion) = m.promotion() {
        priority += PIECE_VALUES[promotion.index()];
    }
    priority
}

fn order_moves(position: &Position, moves: &mut [Move], hash_move: Option<Move>) {
    moves.sort_by_key(|&m| std::cmp::Reverse(move_priority(position, m, hash_move)));
}

pub struct Searcher<'a> {
    tt: &'a TranspositionTable,
    stop: &'a AtomicBool,
    limits: SearchLimits,
    start: Instant,
    nodes: u64,
    stopped: bool,
    /// Keys of the positions before the current node, game history first.
    path: Vec<u64>,
}

impl<'a> Searcher<'a> {
    pub fn new(tt: &'a TranspositionTable, stop: &'a AtomicBool, limits: SearchLimits) -> Self {
        Self {
            tt,
            stop,
            limits,
            start: Instant::now(),
            nodes: 0,
            stopped: false,
            path: Vec::new(),
        }
    }

    /// Keys of the positions played before the root, oldest first.
    pub fn with_history(mut self, history: Vec<u64>) -> Self {
        self.path = history;
        self
    }

    fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if self.stop.load(Ordering::Relaxed) {
            self.stopped = true;
        } else if self.nodes % TIME_CHECK_INTERVAL == 0 {
            if let Some(limit) = self.limits.time {
                self.stopped = self.start.elapsed() >= limit;
            }
        }
        self.stopped
    }

    fn is_repetition(&self, position: &Position, key: u64) -> bool {
        self.path
            .iter()
            .rev()
            .take(position.halfmove_clock as usize)
            .any(|&k| k == key)
    }

    /// Runs iterative deepening from `position`, calling `report` after
    /// every completed depth.
    ///
    /// An iteration cut short by the stop flag or the clock is discarded, so
    /// the result always comes from a fully searched depth. If not even depth
    /// one completes, the first legal move is returned.
    pub fn search(&mut self, position: &Position, mut report: impl FnMut(EngineInfo)) -> SearchResult {
        let mut root = *position;
        let root_key = root.zobrist_hash();
        let mut moves = generate_legal_moves(&mut root);

        let mut result = SearchResult {
            best_move: moves.as_slice().first().copied(),
            score: 0,
            depth: 0,
            nodes: 0,
        };
        if moves.is_empty() {
            result.score = if in_check(&root) { -MATE } else { 0 };
            return result;
        }

        let hash_move = self.tt.lookup(root_key).and_then(|entry| entry.best_move);
        order_moves(&root, moves.as_mut_slice(), hash_move);

        for depth in 1..=self.limits.depth {
            let mut alpha = -INFINITY;
            let mut best: Option<(Move, i32)> = None;

            self.path.push(root_key);
            for &m in &moves {
                let Ok(state) = root.make_move(m) else {
                    continue;
                };
                let score = -self.negamax(&mut root, depth - 1, 1, -INFINITY, -alpha);
                root.unmake_move(m, &state);

                if self.stopped {
                    break;
                }
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((m, score));
                    alpha = alpha.max(score);
                }
            }
            self.path.pop();

            if self.stopped {
                debug!(depth, nodes = self.nodes, "search stopped mid-iteration");
                break;
            }
            let Some((best_move, score)) = best else {
                break;
            };

            result = SearchResult {
                best_move: Some(best_move),
                score,
                depth,
                nodes: self.nodes,
            };
            self.tt.store(TtEntry {
                key: root_key,
                depth,
                score,
                bound: Bound::Exact,
                best_move: Some(best_move),
            });
            if let Some(i) = moves.iter().position(|&m| m == best_move) {
                moves.as_mut_slice()[..=i].rotate_right(1);
            }

            report(self.info(&root, &result));

            if score.abs() >= MATE_BOUND {
                break;
            }
            // The next depth would not finish in the remaining time.
            if self.limits.time.is_some_and(|limit| self.start.elapsed() > limit / 2) {
                break;
            }
        }

        result.nodes = self.nodes;
        result
    }

    fn negamax(&mut self, position: &mut Position, depth: u32, ply: u32, mut alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;
        if self.should_stop() {
            return 0;
        }

        let key = position.zobrist_hash();
        if position.halfmove_clock >= 100 || self.is_repetition(position, key) {
            return 0;
        }

        let mut hash_move = None;
        if let Some(entry) = self.tt.lookup(key) {
            hash_move = entry.best_move;
            if entry.depth >= depth {
                let score = score_from_tt(entry.score, ply);
                match entry.bound {
                    Bound::Exact => return score,
                    Bound::Lower if score >= beta => return score,
                    Bound::Upper if score <= alpha => return score,
                    _ => {}
                }
            }
        }

        let mut moves = generate_legal_moves(position);
        if moves.is_empty() {
            return if in_check(position) { -MATE + ply as i32 } else { 0 };
        }
        if depth == 0 {
            return evaluate(position);
        }

        order_moves(position, moves.as_mut_slice(), hash_move);

        let original_alpha = alpha;
        let mut best_score = -INFINITY;
        let mut best_move = None;

        self.path.push(key);
        for &m in &moves {
            let Ok(state) = position.make_move(m) else {
                continue;
            };
            let score = -self.negamax(position, depth - 1, ply + 1, -beta, -alpha);
            position.unmake_move(m, &state);

            if self.stopped {
                self.path.pop();
                return 0;
            }
            if score > best_score {
                best_score = score;
                best_move = Some(m);
            }
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }
        self.path.pop();

        let bound = if best_score >= beta {
            Bound::Lower
        } else if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.tt.store(TtEntry {
            key,
            depth,
            score: score_to_tt(best_score, ply),
            bound,
            best_move,
        });

        best_score
    }

    /// Follows stored best moves from the root, checking each is legal.
    fn principal_variation(&self, position: &Position, max_len: u32) -> Vec<Move> {
        let mut pv = Vec::new();
        let mut current = *position;
        let mut seen = Vec::new();

        while pv.len() < max_len as usize {
            let key = current.zobrist_hash();
            if seen.contains(&key) {
                break;
            }
            seen.push(key);

            let Some(m) = self.tt.lookup(key).and_then(|entry| entry.best_move) else {
                break;
            };
            if !generate_legal_moves(&mut current).contains(m) || current.make_move(m).is_err() {
                break;
            }
            pv.push(m);
        }
        pv
    }

    fn info(&self, root: &Position, result: &SearchResult) -> EngineInfo {
        let elapsed = self.start.elapsed();
        let millis = elapsed.as_millis() as u64;
        let nps = (self.nodes as f64 / elapsed.as_secs_f64().max(0.001)) as u64;

        let mut pv = self.principal_variation(root, result.depth);
        if pv.first() != result.best_move.as_ref() {
            pv = result.best_move.into_iter().collect();
        }

        InfoBuilder::new()
            .depth(result.depth)
            .score(uci_score(result.score))
            .nodes(self.nodes)
            .nps(nps)
            .time(millis)
            .hashfull(self.tt.hashfull())
            .pv(pv.iter().map(|m| m.to_uci()))
            .build()
    }
}
