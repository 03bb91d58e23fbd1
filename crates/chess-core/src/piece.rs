//! Piece kinds, independent of color.

use crate::Color;
use std::fmt;

/// The six piece types. The discriminant is the bitboard slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Piece {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl Piece {
    pub const ALL: [Piece; 6] = [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ];

    /// Pieces a pawn may promote to, in generation order.
    pub const PROMOTIONS: [Piece; 4] = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 6 {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }

    /// Lowercase letter used in FEN and in move promotion suffixes.
    #[inline]
    pub const fn to_char(self) -> char {
        LETTERS[self as usize]
    }

    /// Uppercase for White, lowercase for Black.
    pub const fn to_fen_char(self, color: Color) -> char {
        match color {
            Color::White => self.to_char().to_ascii_uppercase(),
            Color::Black => self.to_char(),
        }
    }

    /// Inverse of [`Piece::to_fen_char`].
    pub const fn from_fen_char(c: char) -> Option<(Piece, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        match Self::from_letter(c.to_ascii_lowercase()) {
            Some(piece) => Some((piece, color)),
            None => None,
        }
    }

    /// Parses a promotion suffix (`n`, `b`, `r`, `q`, either case).
    pub const fn from_promotion_char(c: char) -> Option<Piece> {
        match Self::from_letter(c.to_ascii_lowercase()) {
            Some(Piece::Pawn | Piece::King) | None => None,
            piece => piece,
        }
    }

    const fn from_letter(c: char) -> Option<Piece> {
        let mut i = 0;
        while i < LETTERS.len() {
            if LETTERS[i] == c {
                return Some(Self::ALL[i]);
            }
            i += 1;
        }
        None
    }
}

const LETTERS: [char; 6] = ['p', 'n', 'b', 'r', 'q', 'k'];

const NAMES: [&str; 6] = ["Pawn", "Knight", "Bishop", "Rook", "Queen", "King"];

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NAMES[self.index()])
    }
}
