//! Move generation.
//!
//! Pseudo-legal moves come straight from the attack tables; the legal list
//! is filtered by making each candidate, checking the mover's king, and
//! unmaking it again.

mod attacks;
mod magics;
pub mod perft;

use crate::position::CastlePath;
use crate::{Bitboard, Position};
use chess_core::{Color, Move, Piece, Square};

pub use attacks::{
    bishop_attacks, init, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks,
};

/// A list of moves with a fixed maximum capacity.
///
/// Chess positions have at most 218 legal moves, so we use a fixed-size
/// array to avoid heap allocations during move generation.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; Self::MAX_MOVES],
    len: usize,
}

impl MoveList {
    /// Capacity, above the 218-move maximum of any legal position.
    pub const MAX_MOVES: usize = 256;

    /// Creates an empty list.
    #[inline]
    pub const fn new() -> Self {
        MoveList {
            moves: [Move::NULL; Self::MAX_MOVES],
            len: 0,
        }
    }

    /// Appends a move.
    #[inline]
    pub fn push(&mut self, m: Move) {
        debug_assert!(self.len < Self::MAX_MOVES);
        self.moves[self.len] = m;
        self.len += 1;
    }

    /// Returns the number of moves.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list holds no moves.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the moves as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    /// Mutable view for in-place move ordering.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Move] {
        &mut self.moves[..self.len]
    }

    /// Iterates over the moves in generation order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    /// Returns true if `m` is in the list.
    #[inline]
    pub fn contains(&self, m: Move) -> bool {
        self.as_slice().contains(&m)
    }

    /// Removes all moves.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Retains only moves for which the predicate returns true.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&Move) -> bool,
    {
        let mut write = 0;
        for read in 0..self.len {
            if f(&self.moves[read]) {
                self.moves[write] = self.moves[read];
                write += 1;
            }
        }
        self.len = write;
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// Appends every pseudo-legal move of `color` to `moves`.
///
/// Moves may leave the mover's own king attacked. En passant is only
/// produced for the side to move, since the stored target belongs to it.
pub fn generate_pseudo_legal(position: &Position, color: Color, moves: &mut MoveList) {
    generate_pawn_moves(position, color, moves);
    for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King] {
        generate_piece_moves(position, color, piece, moves);
    }
    generate_castling_moves(position, color, moves);
}

/// Generates the legal moves of the side to move.
///
/// Each candidate is made and unmade on `position`, which is back in its
/// original state when this returns.
pub fn generate_legal_moves(position: &mut Position) -> MoveList {
    let us = position.side_to_move;
    let mut moves = MoveList::new();
    generate_pseudo_legal(position, us, &mut moves);

    moves.retain(|&m| match position.make_move(m) {
        Ok(state) => {
            let safe = !is_king_attacked(position, us);
            position.unmake_move(m, &state);
            safe
        }
        Err(_) => false,
    });
    moves
}

/// Legal moves of a position held by shared reference.
pub fn legal_moves(position: &Position) -> MoveList {
    let mut scratch = *position;
    generate_legal_moves(&mut scratch)
}

#[inline]
fn forward(bb: Bitboard, color: Color) -> Bitboard {
    match color {
        Color::White => bb.north(),
        Color::Black => bb.south(),
    }
}

fn push_pawn_move(moves: &mut MoveList, color: Color, from: Square, to: Square, capture: bool) {
    if to.rank() == color.promotion_rank() {
        for promotion in Piece::PROMOTIONS {
            moves.push(Move::promoting(from, to, promotion, capture));
        }
    } else if capture {
        moves.push(Move::capture(from, to, Piece::Pawn));
    } else {
        moves.push(Move::quiet(from, to, Piece::Pawn));
    }
}

fn generate_pawn_moves(position: &Position, color: Color, moves: &mut MoveList) {
    let pawns = position.pieces_of(Piece::Pawn, color);
    let enemies = position.color_occupancy(color.opposite());
    let empty = position.empty_squares();
    let dir = color.push_offset();
    let third_rank = match color {
        Color::White => Bitboard::RANK_3,
        Color::Black => Bitboard::RANK_6,
    };

    let single = forward(pawns, color) & empty;
    for to in single {
        if let Some(from) = to.offset(-dir) {
            push_pawn_move(moves, color, from, to, false);
        }
    }

    let double = forward(single & third_rank, color) & empty;
    for to in double {
        if let Some(from) = to.offset(-2 * dir) {
            moves.push(Move::double_push(from, to));
        }
    }

    for from in pawns {
        for to in pawn_attacks(from, color) & enemies {
            push_pawn_move(moves, color, from, to, true);
        }
    }

    if color == position.side_to_move {
        if let Some(target) = position.en_passant {
            // Pawns that could capture onto the target are the ones an enemy
            // pawn on the target would attack.
            for from in pawn_attacks(target, color.opposite()) & pawns {
                moves.push(Move::en_passant(from, target));
            }
        }
    }
}

fn generate_piece_moves(position: &Position, color: Color, piece: Piece, moves: &mut MoveList) {
    let own = position.color_occupancy(color);
    let enemies = position.color_occupancy(color.opposite());
    let occupied = position.occupied();

    for from in position.pieces_of(piece, color) {
        let targets = match piece {
            Piece::Knight => knight_attacks(from),
            Piece::Bishop => bishop_attacks(from, occupied),
            Piece::Rook => rook_attacks(from, occupied),
            Piece::Queen => queen_attacks(from, occupied),
            Piece::King => king_attacks(from),
            Piece::Pawn => Bitboard::EMPTY,
        } & !own;

        for to in targets {
            if enemies.contains(to) {
                moves.push(Move::capture(from, to, piece));
            } else {
                moves.push(Move::quiet(from, to, piece));
            }
        }
    }
}

fn generate_castling_moves(position: &Position, color: Color, moves: &mut MoveList) {
    let them = color.opposite();
    for kingside in [true, false] {
        if !position.castling.has(color, kingside) {
            continue;
        }
        let path = CastlePath::new(color, kingside);
        let pieces_home = position.pieces_of(Piece::King, color).contains(path.king_from)
            && position.pieces_of(Piece::Rook, color).contains(path.rook_from);
        if !pieces_home || (position.occupied() & path.between).is_not_empty() {
            continue;
        }
        if path
            .king_walk
            .iter()
            .any(|&sq| is_square_attacked(position, sq, them))
        {
            continue;
        }
        moves.push(Move::castle(path.king_from, path.king_to));
    }
}

/// Returns true if any piece of `by_color` attacks `sq`.
pub fn is_square_attacked(position: &Position, sq: Square, by_color: Color) -> bool {
    let occupied = position.occupied();
    let queens = position.pieces_of(Piece::Queen, by_color);

    (pawn_attacks(sq, by_color.opposite()) & position.pieces_of(Piece::Pawn, by_color))
        .is_not_empty()
        || (knight_attacks(sq) & position.pieces_of(Piece::Knight, by_color)).is_not_empty()
        || (bishop_attacks(sq, occupied) & (position.pieces_of(Piece::Bishop, by_color) | queens))
            .is_not_empty()
        || (rook_attacks(sq, occupied) & (position.pieces_of(Piece::Rook, by_color) | queens))
            .is_not_empty()
        || (king_attacks(sq) & position.pieces_of(Piece::King, by_color)).is_not_empty()
}

/// Returns true if the king of the given color is attacked.
///
/// A side without a king is never in check.
pub fn is_king_attacked(position: &Position, king_color: Color) -> bool {
    position
        .king_square(king_color)
        .is_some_and(|sq| is_square_attacked(position, sq, king_color.opposite()))
}

/// Returns true if the side to move is in check.
#[inline]
pub fn in_check(position: &Position) -> bool {
    is_king_attacked(position, position.side_to_move)
}
