//! Bitboard chess engine core.
//!
//! This crate provides:
//! - [`Bitboard`] - 64-bit square sets with shift and scan helpers
//! - Magic attack tables for sliders and const tables for leapers
//! - [`Position`] - board state with FEN import/export
//! - In-place make/unmake with an undo record ([`MoveState`])
//! - Pseudo-legal and legal move generation
//! - Perft, sequential and parallel
//! - Zobrist hashing and move-text resolution
//!
//! # Example
//!
//! ```
//! use chess_engine::{movegen, Position};
//!
//! chess_engine::init();
//! let mut position = Position::startpos();
//! let moves = movegen::generate_legal_moves(&mut position);
//! assert_eq!(moves.len(), 20);
//! assert_eq!(movegen::perft::perft(&mut position, 3), 8902);
//! ```

mod bitboard;
mod makemove;
pub mod movegen;
pub mod notation;
mod position;
mod zobrist;

pub use bitboard::Bitboard;
pub use makemove::{MoveError, MoveState};
pub use movegen::{
    bishop_attacks, generate_legal_moves, generate_pseudo_legal, in_check, init,
    is_king_attacked, is_square_attacked, king_attacks, knight_attacks, legal_moves,
    pawn_attacks, queen_attacks, rook_attacks, MoveList,
};
pub use notation::{parse_move, resolve, NotationError};
pub use position::{CastlingRights, Position, PositionError};
