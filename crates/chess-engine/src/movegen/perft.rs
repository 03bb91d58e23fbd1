//! Perft (performance test) for move generator validation.
//!
//! Perft counts the number of leaf nodes at a given depth, which can be
//! compared against known-correct values to validate the move generator.

use chess_core::Move;
use rayon::prelude::*;

use super::generate_legal_moves;
use crate::Position;

// Every generated legal move has already passed `make_move` once.
const LEGAL_MOVE_APPLIES: &str = "generated legal move must apply";

/// Counts the leaf nodes of the legal move tree `depth` plies deep.
///
/// The position is walked with make/unmake and returned unchanged.
pub fn perft(position: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = generate_legal_moves(position);
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0u64;
    for &m in &moves {
        let state = position.make_move(m).expect(LEGAL_MOVE_APPLIES);
        nodes += perft(position, depth - 1);
        position.unmake_move(m, &state);
    }
    nodes
}

/// Node count below each root move, sorted by the move's UCI text.
pub fn perft_divide(position: &mut Position, depth: u32) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }

    let moves = generate_legal_moves(position);
    let mut results = Vec::with_capacity(moves.len());
    for &m in &moves {
        let state = position.make_move(m).expect(LEGAL_MOVE_APPLIES);
        results.push((m, perft(position, depth - 1)));
        position.unmake_move(m, &state);
    }

    results.sort_by_cached_key(|(m, _)| m.to_uci());
    results
}

/// [`perft`] with the root moves spread over the rayon thread pool.
///
/// Every worker walks its own copy of the position.
pub fn perft_parallel(position: &Position, depth: u32) -> u64 {
    let mut root = *position;
    if depth <= 1 {
        return perft(&mut root, depth);
    }

    let moves = generate_legal_moves(&mut root);
    moves
        .as_slice()
        .par_iter()
        .map(|&m| {
            let mut child = *position;
            child.make_move(m).expect(LEGAL_MOVE_APPLIES);
            perft(&mut child, depth - 1)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    const POSITION_3: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
    const POSITION_4: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
    const POSITION_5: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1";
    const LONE_ROOK: &str = "4k3/8/8/8/8/8/8/4K2R w K - 0 1";

    fn count(fen: &str, depth: u32) -> u64 {
        let mut position = Position::from_fen(fen).unwrap();
        let before = position;
        let nodes = perft(&mut position, depth);
        assert_eq!(position, before, "perft left {} modified", fen);
        nodes
    }

    #[test]
    fn depth_zero_is_one() {
        assert_eq!(perft(&mut Position::startpos(), 0), 1);
    }

    #[test]
    fn perft_startpos_shallow() {
        let mut position = Position::startpos();
        assert_eq!(perft(&mut position, 1), 20);
        assert_eq!(perft(&mut position, 2), 400);
        assert_eq!(perft(&mut position, 3), 8902);
    }

    #[test]
    fn perft_startpos_depth_4() {
        assert_eq!(count(chess_core::FenParser::STARTPOS, 4), 197_281);
    }

    #[test]
    #[ignore]
    fn perft_startpos_depth_5() {
        assert_eq!(count(chess_core::FenParser::STARTPOS, 5), 4_865_609);
    }

    #[test]
    #[ignore]
    fn perft_startpos_depth_6() {
        assert_eq!(perft_parallel(&Position::startpos(), 6), 119_060_324);
    }

    #[test]
    fn perft_kiwipete() {
        assert_eq!(count(KIWIPETE, 1), 48);
        assert_eq!(count(KIWIPETE, 2), 2039);
        assert_eq!(count(KIWIPETE, 3), 97_862);
    }

    #[test]
    fn perft_lone_rook() {
        assert_eq!(count(LONE_ROOK, 1), 15);
        assert_eq!(count(LONE_ROOK, 2), 66);
        assert_eq!(count(LONE_ROOK, 3), 1197);
        assert_eq!(count(LONE_ROOK, 4), 7059);
    }

    #[test]
    #[ignore]
    fn perft_lone_rook_deep() {
        assert_eq!(count(LONE_ROOK, 5), 133_987);
        assert_eq!(count(LONE_ROOK, 6), 764_643);
    }

    #[test]
    fn perft_position3() {
        assert_eq!(count(POSITION_3, 1), 14);
        assert_eq!(count(POSITION_3, 2), 191);
        assert_eq!(count(POSITION_3, 3), 2812);
    }

    #[test]
    fn perft_position4() {
        assert_eq!(count(POSITION_4, 1), 6);
        assert_eq!(count(POSITION_4, 2), 264);
        assert_eq!(count(POSITION_4, 3), 9467);
    }

    #[test]
    fn perft_position5() {
        assert_eq!(count(POSITION_5, 1), 44);
        assert_eq!(count(POSITION_5, 2), 1486);
        assert_eq!(count(POSITION_5, 3), 62_379);
    }

    #[test]
    fn divide_is_sorted_and_sums_to_perft() {
        let mut position = Position::from_fen(KIWIPETE).unwrap();
        let results = perft_divide(&mut position, 2);
        assert_eq!(results.len(), 48);
        assert_eq!(results.iter().map(|(_, n)| n).sum::<u64>(), 2039);

        let texts: Vec<String> = results.iter().map(|(m, _)| m.to_uci()).collect();
        let mut sorted = texts.clone();
        sorted.sort();
        assert_eq!(texts, sorted);

        assert!(perft_divide(&mut position, 0).is_empty());
    }

    #[test]
    fn divide_at_depth_one_counts_each_move_once() {
        let mut position = Position::startpos();
        let results = perft_divide(&mut position, 1);
        assert_eq!(results.len(), 20);
        assert!(results.iter().all(|(_, n)| *n == 1));
        assert_eq!(results[0].0.to_uci(), "a2a3");
    }

    #[test]
    fn parallel_matches_sequential() {
        let position = Position::from_fen(KIWIPETE).unwrap();
        assert_eq!(perft_parallel(&position, 1), 48);
        assert_eq!(perft_parallel(&position, 3), 97_862);
        assert_eq!(perft_parallel(&Position::startpos(), 0), 1);
    }
}
