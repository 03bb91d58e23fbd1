//! Turning move text into packed moves of a concrete position.

use chess_core::{Move, MoveText, MoveTextError};
use thiserror::Error;

use crate::movegen::legal_moves;
use crate::Position;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error(transparent)]
    Text(#[from] MoveTextError),

    #[error("{0} is not a legal move in this position")]
    NoLegalMatch(String),
}

/// Finds the legal move of `position` that `text` describes.
///
/// Piece type and capture, en passant and castling flags all come from the
/// board, so the returned move is exactly what the generator produces.
pub fn resolve(position: &Position, text: &MoveText) -> Result<Move, NotationError> {
    legal_moves(position)
        .iter()
        .copied()
        .find(|&m| text.matches(m))
        .ok_or_else(|| NotationError::NoLegalMatch(text.to_string()))
}

/// Parses UCI or dash notation and resolves it against `position`.
pub fn parse_move(position: &Position, s: &str) -> Result<Move, NotationError> {
    resolve(position, &MoveText::parse(s)?)
}
