//! Board vocabulary shared by the engine, the UCI front end and the tools.
//!
//! Nothing here knows about bitboards: these are the plain value types
//! ([`Color`], [`Piece`], [`Square`]), the packed [`Move`] with its text form
//! [`MoveText`], and [`FenParser`], which splits a FEN record into checked
//! fields.

mod color;
mod fen;
mod mov;
mod piece;
mod square;

pub use color::Color;
pub use fen::{FenError, FenParser};
pub use mov::{Move, MoveText, MoveTextError};
pub use piece::Piece;
pub use square::{File, Rank, Square};
