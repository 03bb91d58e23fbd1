//! Chess position representation.

use std::fmt;

use chess_core::{Color, FenError, FenParser, Piece, Square};
use thiserror::Error;

use crate::Bitboard;

/// Castling rights as a 4-bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: u8 = 0b0001;
    pub const WHITE_QUEENSIDE: u8 = 0b0010;
    pub const BLACK_KINGSIDE: u8 = 0b0100;
    pub const BLACK_QUEENSIDE: u8 = 0b1000;
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline]
    pub const fn new(flags: u8) -> Self {
        CastlingRights(flags & 0b1111)
    }

    /// The flag guarding one castle.
    #[inline]
    pub const fn flag(color: Color, kingside: bool) -> u8 {
        match (color, kingside) {
            (Color::White, true) => Self::WHITE_KINGSIDE,
            (Color::White, false) => Self::WHITE_QUEENSIDE,
            (Color::Black, true) => Self::BLACK_KINGSIDE,
            (Color::Black, false) => Self::BLACK_QUEENSIDE,
        }
    }

    #[inline]
    pub const fn has(self, color: Color, kingside: bool) -> bool {
        self.0 & Self::flag(color, kingside) != 0
    }

    #[inline]
    pub const fn can_castle_kingside(self, color: Color) -> bool {
        self.has(color, true)
    }

    #[inline]
    pub const fn can_castle_queenside(self, color: Color) -> bool {
        self.has(color, false)
    }

    /// Removes both rights of a color.
    #[inline]
    pub fn remove_color(&mut self, color: Color) {
        self.0 &= !(Self::flag(color, true) | Self::flag(color, false));
    }

    #[inline]
    pub fn remove(&mut self, color: Color, kingside: bool) {
        self.0 &= !Self::flag(color, kingside);
    }

    /// Drops whatever right depends on a rook standing on `sq`.
    #[inline]
    pub fn remove_for_corner(&mut self, sq: Square) {
        match sq {
            Square::H1 => self.remove(Color::White, true),
            Square::A1 => self.remove(Color::White, false),
            Square::H8 => self.remove(Color::Black, true),
            Square::A8 => self.remove(Color::Black, false),
            _ => {}
        }
    }

    /// Rights from a FEN castling field; letters other than `KQkq` are ignored.
    pub fn from_fen_field(field: &str) -> Self {
        let mut flags = 0;
        for c in field.chars() {
            flags |= match c {
                'K' => Self::WHITE_KINGSIDE,
                'Q' => Self::WHITE_QUEENSIDE,
                'k' => Self::BLACK_KINGSIDE,
                'q' => Self::BLACK_QUEENSIDE,
                _ => 0,
            };
        }
        CastlingRights(flags)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CastlingRights {
    /// FEN castling field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("-");
        }
        for (flag, c) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.0 & flag != 0 {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// Fixed squares involved in one castle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CastlePath {
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
    /// Squares strictly between king and rook; all must be empty.
    pub between: Bitboard,
    /// King start, pass-through and destination; none may be attacked.
    pub king_walk: [Square; 3],
}

impl CastlePath {
    pub const fn new(color: Color, kingside: bool) -> Self {
        const fn sq(color: Color, file: u8) -> Square {
            match color {
                Color::White => Square::from_bits(file),
                Color::Black => Square::from_bits(56 + file),
            }
        }
        if kingside {
            CastlePath {
                king_from: sq(color, 4),
                king_to: sq(color, 6),
                rook_from: sq(color, 7),
                rook_to: sq(color, 5),
                between: Bitboard::from_squares(&[sq(color, 5), sq(color, 6)]),
                king_walk: [sq(color, 4), sq(color, 5), sq(color, 6)],
            }
        } else {
            CastlePath {
                king_from: sq(color, 4),
                king_to: sq(color, 2),
                rook_from: sq(color, 0),
                rook_to: sq(color, 3),
                between: Bitboard::from_squares(&[sq(color, 1), sq(color, 2), sq(color, 3)]),
                king_walk: [sq(color, 4), sq(color, 3), sq(color, 2)],
            }
        }
    }
}

/// Structural defects found by [`Position::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("square {0} holds more than one piece")]
    SquareOwnedTwice(Square),

    #[error("{0} has {1} kings")]
    TooManyKings(Color, u32),

    #[error("cached occupancy does not match the piece bitboards")]
    StaleOccupancy,
}

const BOTH: usize = 2;

/// Complete chess position state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Piece bitboards indexed `[color][piece]`.
    pub(crate) pieces: [[Bitboard; 6]; 2],

    /// White, black and combined occupancy, derived from `pieces`.
    pub(crate) occupancy: [Bitboard; 3],

    pub side_to_move: Color,

    pub castling: CastlingRights,

    /// Square a pawn skipped on the last move, if that move was a double push.
    pub en_passant: Option<Square>,

    /// Halfmove clock for 50-move rule.
    pub halfmove_clock: u32,

    /// Fullmove number (starts at 1, increments after Black's move).
    pub fullmove_number: u32,
}

impl Position {
    /// An empty board, White to move.
    pub fn empty() -> Self {
        Position {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupancy: [Bitboard::EMPTY; 3],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Creates the standard starting position.
    pub fn startpos() -> Self {
        Self::from_parsed(&FenParser::default())
    }

    /// Creates a position from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self::from_parsed(&FenParser::parse(fen)?))
    }

    /// Replaces this position with the one described by `fen`.
    ///
    /// On error `self` is left exactly as it was.
    pub fn load_fen(&mut self, fen: &str) -> Result<(), FenError> {
        *self = Self::from_fen(fen)?;
        Ok(())
    }

    fn from_parsed(parsed: &FenParser) -> Self {
        let mut position = Position::empty();
        for (index, occupant) in parsed.placement.iter().enumerate() {
            if let Some((piece, color)) = *occupant {
                position.pieces[color.index()][piece.index()].set(Square::from_bits(index as u8));
            }
        }
        position.side_to_move = parsed.active_color;
        position.castling = CastlingRights::from_fen_field(&parsed.castling);
        position.en_passant = parsed.en_passant;
        position.halfmove_clock = parsed.halfmove_clock;
        position.fullmove_number = parsed.fullmove_number;
        position.update_occupancies();
        position
    }

    /// Converts the position to a FEN string.
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            FenParser::write_placement(|sq| self.piece_at(sq)),
            self.side_to_move.to_fen_char(),
            self.castling,
            self.en_passant
                .map_or_else(|| "-".to_string(), |sq| sq.to_algebraic()),
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Removes every piece and all castling/en passant state.
    ///
    /// Side to move and clocks are kept.
    pub fn clear(&mut self) {
        self.pieces = [[Bitboard::EMPTY; 6]; 2];
        self.castling = CastlingRights::NONE;
        self.en_passant = None;
        self.update_occupancies();
    }

    /// Recomputes the cached occupancies from the piece bitboards.
    pub fn update_occupancies(&mut self) {
        for color in Color::ALL {
            self.occupancy[color.index()] = self.pieces[color.index()]
                .iter()
                .fold(Bitboard::EMPTY, |acc, &bb| acc | bb);
        }
        self.occupancy[BOTH] = self.occupancy[0] | self.occupancy[1];
    }

    /// Places a piece, replacing anything already on `sq`.
    pub fn put_piece(&mut self, piece: Piece, color: Color, sq: Square) {
        self.remove_piece(sq);
        self.pieces[color.index()][piece.index()].set(sq);
        self.update_occupancies();
    }

    /// Removes and returns whatever stands on `sq`.
    pub fn remove_piece(&mut self, sq: Square) -> Option<(Piece, Color)> {
        let occupant = self.piece_at(sq)?;
        self.pieces[occupant.1.index()][occupant.0.index()].clear(sq);
        self.update_occupancies();
        Some(occupant)
    }

    /// Returns the piece and color at the given square, if any.
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        let color = self.color_at(sq)?;
        let piece = Piece::ALL
            .into_iter()
            .find(|p| self.pieces[color.index()][p.index()].contains(sq))?;
        Some((piece, color))
    }

    #[inline]
    pub fn color_at(&self, sq: Square) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|c| self.occupancy[c.index()].contains(sq))
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.occupancy[BOTH]
    }

    #[inline]
    pub fn empty_squares(&self) -> Bitboard {
        !self.occupied()
    }

    #[inline]
    pub fn color_occupancy(&self, color: Color) -> Bitboard {
        self.occupancy[color.index()]
    }

    #[inline]
    pub fn pieces_of(&self, piece: Piece, color: Color) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    /// The king of `color`, or `None` on a board without one.
    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(Piece::King, color).lsb()
    }

    /// Checks the structural invariants of the board.
    pub fn validate(&self) -> Result<(), PositionError> {
        let mut seen = Bitboard::EMPTY;
        for color in Color::ALL {
            for bb in self.pieces[color.index()] {
                if let Some(sq) = (seen & bb).lsb() {
                    return Err(PositionError::SquareOwnedTwice(sq));
                }
                seen |= bb;
            }
            let kings = self.pieces_of(Piece::King, color).count();
            if kings > 1 {
                return Err(PositionError::TooManyKings(color, kings));
            }
        }

        let mut expected = *self;
        expected.update_occupancies();
        if expected.occupancy != self.occupancy {
            return Err(PositionError::StaleOccupancy);
        }
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let c = self
                    .piece_at(Square::from_bits(rank * 8 + file))
                    .map_or('.', |(piece, color)| piece.to_fen_char(color));
                write!(f, "{} ", c)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        write!(f, "{}", self.to_fen())
    }
}
