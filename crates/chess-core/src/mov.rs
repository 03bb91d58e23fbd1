//! Packed move representation and move text.

use crate::{Piece, Square};
use std::fmt;
use thiserror::Error;

const TO_SHIFT: u32 = 6;
const PIECE_SHIFT: u32 = 12;
const PROMOTION_SHIFT: u32 = 15;
const NO_PROMOTION: u32 = 7;

const CAPTURE: u32 = 1 << 18;
const DOUBLE_PUSH: u32 = 1 << 19;
const EN_PASSANT: u32 = 1 << 20;
const CASTLING: u32 = 1 << 21;

const USED_BITS: u32 = (1 << 22) - 1;

/// A chess move.
///
/// Packed into 22 bits of a `u32`:
///
/// | bits  | field                          |
/// |-------|--------------------------------|
/// | 0-5   | from square                    |
/// | 6-11  | to square                      |
/// | 12-14 | moved piece                    |
/// | 15-17 | promotion piece (7 = none)     |
/// | 18    | capture                        |
/// | 19    | double pawn push               |
/// | 20    | en passant capture             |
/// | 21    | castling (king move)           |
///
/// Two moves are equal iff every field is equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u32);

impl Move {
    /// Placeholder that is never a legal move (a1a1, no piece movement).
    pub const NULL: Move = Move(NO_PROMOTION << PROMOTION_SHIFT);

    #[inline]
    const fn pack(from: Square, to: Square, piece: Piece, promotion: Option<Piece>, flags: u32) -> Self {
        let promo = match promotion {
            Some(p) => p as u32,
            None => NO_PROMOTION,
        };
        Move(
            from.index() as u32
                | (to.index() as u32) << TO_SHIFT
                | (piece as u32) << PIECE_SHIFT
                | promo << PROMOTION_SHIFT
                | flags,
        )
    }

    /// A non-capturing move with no special effects.
    #[inline]
    pub const fn quiet(from: Square, to: Square, piece: Piece) -> Self {
        Self::pack(from, to, piece, None, 0)
    }

    /// A capture of whatever stands on `to`.
    #[inline]
    pub const fn capture(from: Square, to: Square, piece: Piece) -> Self {
        Self::pack(from, to, piece, None, CAPTURE)
    }

    /// A pawn advancing two squares from its start rank.
    #[inline]
    pub const fn double_push(from: Square, to: Square) -> Self {
        Self::pack(from, to, Piece::Pawn, None, DOUBLE_PUSH)
    }

    /// A pawn capturing en passant onto the skipped square `to`.
    #[inline]
    pub const fn en_passant(from: Square, to: Square) -> Self {
        Self::pack(from, to, Piece::Pawn, None, CAPTURE | EN_PASSANT)
    }

    /// A castling move, encoded as the king's own from/to squares.
    #[inline]
    pub const fn castle(from: Square, to: Square) -> Self {
        Self::pack(from, to, Piece::King, None, CASTLING)
    }

    /// A pawn move onto the last rank, promoting to `promotion`.
    #[inline]
    pub const fn promoting(from: Square, to: Square, promotion: Piece, capture: bool) -> Self {
        let flags = if capture { CAPTURE } else { 0 };
        Self::pack(from, to, Piece::Pawn, Some(promotion), flags)
    }

    #[inline]
    pub const fn from(self) -> Square {
        Square::from_bits((self.0 & 0x3F) as u8)
    }

    #[inline]
    pub const fn to(self) -> Square {
        Square::from_bits(((self.0 >> TO_SHIFT) & 0x3F) as u8)
    }

    /// The piece type standing on `from` before the move.
    #[inline]
    pub const fn piece(self) -> Piece {
        match Piece::from_index(((self.0 >> PIECE_SHIFT) & 0x7) as u8) {
            Some(p) => p,
            None => Piece::Pawn,
        }
    }

    #[inline]
    pub const fn promotion(self) -> Option<Piece> {
        Piece::from_index(((self.0 >> PROMOTION_SHIFT) & 0x7) as u8)
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.promotion().is_some()
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        self.0 & CAPTURE != 0
    }

    #[inline]
    pub const fn is_double_push(self) -> bool {
        self.0 & DOUBLE_PUSH != 0
    }

    #[inline]
    pub const fn is_en_passant(self) -> bool {
        self.0 & EN_PASSANT != 0
    }

    #[inline]
    pub const fn is_castling(self) -> bool {
        self.0 & CASTLING != 0
    }

    /// True for O-O, false for O-O-O. Meaningless for non-castling moves.
    #[inline]
    pub const fn is_kingside_castle(self) -> bool {
        self.is_castling() && self.to().index() > self.from().index()
    }

    /// The packed value, for storage in hash tables.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Rebuilds a move from [`Move::raw`], rejecting malformed encodings.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw & !USED_BITS != 0 {
            return None;
        }
        let piece = (raw >> PIECE_SHIFT) & 0x7;
        let promo = (raw >> PROMOTION_SHIFT) & 0x7;
        if piece > 5 {
            return None;
        }
        if promo != NO_PROMOTION && (promo == 0 || promo > 4) {
            return None;
        }
        Some(Move(raw))
    }

    /// UCI wire notation, e.g. `e2e4`, `e7e8q`, castling as `e1g1`.
    pub fn to_uci(self) -> String {
        match self.promotion() {
            Some(p) => format!("{}{}{}", self.from(), self.to(), p.to_char()),
            None => format!("{}{}", self.from(), self.to()),
        }
    }

    /// Dash notation, e.g. `e2-e4`, `e7-e8q`, castling as `O-O` / `O-O-O`.
    pub fn to_dash(self) -> String {
        if self.is_castling() {
            return if self.is_kingside_castle() {
                "O-O".to_string()
            } else {
                "O-O-O".to_string()
            };
        }
        match self.promotion() {
            Some(p) => format!("{}-{}{}", self.from(), self.to(), p.to_char()),
            None => format!("{}-{}", self.from(), self.to()),
        }
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({} {:?}", self.to_uci(), self.piece())?;
        if self.is_capture() {
            write!(f, " capture")?;
        }
        if self.is_double_push() {
            write!(f, " double-push")?;
        }
        if self.is_en_passant() {
            write!(f, " en-passant")?;
        }
        if self.is_castling() {
            write!(f, " castling")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

/// Errors from parsing move text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveTextError {
    #[error("invalid move text length: '{0}'")]
    InvalidLength(String),

    #[error("invalid square in move text: '{0}'")]
    InvalidSquare(String),

    #[error("invalid promotion piece in move text: '{0}'")]
    InvalidPromotion(String),
}

/// Position-independent move text.
///
/// Text alone cannot say which piece moves or whether it captures; the
/// engine resolves a `MoveText` against the legal moves of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveText {
    /// `<from><to>[promo]`, with or without a dash.
    Coordinates {
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    },
    /// `O-O` (kingside) or `O-O-O` (queenside).
    Castle { kingside: bool },
}

impl MoveText {
    /// Parses UCI notation (`e2e4`, `e7e8q`).
    pub fn parse_uci(s: &str) -> Result<Self, MoveTextError> {
        let s = s.trim();
        if !s.is_ascii() || (s.len() != 4 && s.len() != 5) {
            return Err(MoveTextError::InvalidLength(s.to_string()));
        }
        Self::coordinates(s, &s[..2], &s[2..4], &s[4..])
    }

    /// Parses dash notation (`e2-e4`, `e7-e8q`, `O-O`, `O-O-O`).
    ///
    /// Castling tokens also accept the digit-zero spelling `0-0`.
    pub fn parse_dash(s: &str) -> Result<Self, MoveTextError> {
        let s = s.trim();
        match s {
            "O-O" | "0-0" => return Ok(MoveText::Castle { kingside: true }),
            "O-O-O" | "0-0-0" => return Ok(MoveText::Castle { kingside: false }),
            _ => {}
        }
        if !s.is_ascii() || (s.len() != 5 && s.len() != 6) || &s[2..3] != "-" {
            return Err(MoveTextError::InvalidLength(s.to_string()));
        }
        Self::coordinates(s, &s[..2], &s[3..5], &s[5..])
    }

    /// Parses either notation.
    pub fn parse(s: &str) -> Result<Self, MoveTextError> {
        if s.contains('-') {
            Self::parse_dash(s)
        } else {
            Self::parse_uci(s)
        }
    }

    fn coordinates(whole: &str, from: &str, to: &str, promo: &str) -> Result<Self, MoveTextError> {
        let from =
            Square::from_algebraic(from).ok_or_else(|| MoveTextError::InvalidSquare(whole.to_string()))?;
        let to =
            Square::from_algebraic(to).ok_or_else(|| MoveTextError::InvalidSquare(whole.to_string()))?;
        let promotion = match promo.chars().next() {
            None => None,
            Some(c) => Some(
                Piece::from_promotion_char(c)
                    .ok_or_else(|| MoveTextError::InvalidPromotion(whole.to_string()))?,
            ),
        };
        Ok(MoveText::Coordinates { from, to, promotion })
    }

    /// Returns true if `m` is the move this text describes.
    pub fn matches(&self, m: Move) -> bool {
        match *self {
            MoveText::Coordinates { from, to, promotion } => {
                m.from() == from && m.to() == to && m.promotion() == promotion
            }
            MoveText::Castle { kingside } => {
                m.is_castling() && m.is_kingside_castle() == kingside
            }
        }
    }
}

impl fmt::Display for MoveText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveText::Coordinates { from, to, promotion } => {
                write!(f, "{}{}", from, to)?;
                if let Some(p) = promotion {
                    write!(f, "{}", p.to_char())?;
                }
                Ok(())
            }
            MoveText::Castle { kingside: true } => write!(f, "O-O"),
            MoveText::Castle { kingside: false } => write!(f, "O-O-O"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn fields_survive_packing() {
        let m = Move::double_push(sq("e2"), sq("e4"));
        assert_eq!(m.from(), sq("e2"));
        assert_eq!(m.to(), sq("e4"));
        assert_eq!(m.piece(), Piece::Pawn);
        assert_eq!(m.promotion(), None);
        assert!(m.is_double_push());
        assert!(!m.is_capture() && !m.is_en_passant() && !m.is_castling());

        let p = Move::promoting(sq("b7"), sq("a8"), Piece::Knight, true);
        assert_eq!(p.piece(), Piece::Pawn);
        assert_eq!(p.promotion(), Some(Piece::Knight));
        assert!(p.is_capture());

        let ep = Move::en_passant(sq("e5"), sq("d6"));
        assert!(ep.is_capture() && ep.is_en_passant());

        let c = Move::castle(Square::E8, Square::C8);
        assert_eq!(c.piece(), Piece::King);
        assert!(c.is_castling());
        assert!(!c.is_kingside_castle());
        assert!(Move::castle(Square::E1, Square::G1).is_kingside_castle());
    }

    #[test]
    fn equality_covers_every_field() {
        let quiet = Move::quiet(sq("e1"), sq("g1"), Piece::Rook);
        let castle = Move::castle(sq("e1"), sq("g1"));
        assert_ne!(quiet, castle);
        assert_ne!(
            Move::quiet(sq("d1"), sq("d5"), Piece::Queen),
            Move::capture(sq("d1"), sq("d5"), Piece::Queen)
        );
        assert_ne!(
            Move::promoting(sq("a7"), sq("a8"), Piece::Queen, false),
            Move::promoting(sq("a7"), sq("a8"), Piece::Rook, false)
        );
    }

    #[test]
    fn raw_roundtrip_and_rejection() {
        let m = Move::promoting(sq("g2"), sq("h1"), Piece::Queen, true);
        assert_eq!(Move::from_raw(m.raw()), Some(m));
        assert_eq!(Move::from_raw(Move::NULL.raw()), Some(Move::NULL));
        assert_eq!(Move::from_raw(1 << 30), None);
        assert_eq!(Move::from_raw(6 << PIECE_SHIFT | NO_PROMOTION << PROMOTION_SHIFT), None);
        assert_eq!(Move::from_raw(5 << PROMOTION_SHIFT), None);
    }

    #[test]
    fn uci_and_dash_text() {
        let push = Move::double_push(sq("e2"), sq("e4"));
        assert_eq!(push.to_uci(), "e2e4");
        assert_eq!(push.to_dash(), "e2-e4");

        let promo = Move::promoting(sq("e7"), sq("e8"), Piece::Queen, false);
        assert_eq!(promo.to_uci(), "e7e8q");
        assert_eq!(promo.to_dash(), "e7-e8q");

        let short = Move::castle(Square::E1, Square::G1);
        assert_eq!(short.to_uci(), "e1g1");
        assert_eq!(short.to_dash(), "O-O");
        let long = Move::castle(Square::E8, Square::C8);
        assert_eq!(long.to_uci(), "e8c8");
        assert_eq!(long.to_dash(), "O-O-O");
    }

    #[test]
    fn debug_lists_flags() {
        let ep = Move::en_passant(sq("e5"), sq("d6"));
        assert_eq!(format!("{:?}", ep), "Move(e5d6 Pawn capture en-passant)");
        assert_eq!(format!("{}", ep), "e5d6");
    }

    #[test]
    fn parse_uci_text() {
        assert_eq!(
            MoveText::parse_uci("e2e4"),
            Ok(MoveText::Coordinates {
                from: sq("e2"),
                to: sq("e4"),
                promotion: None
            })
        );
        assert_eq!(
            MoveText::parse_uci("e7e8N"),
            Ok(MoveText::Coordinates {
                from: sq("e7"),
                to: sq("e8"),
                promotion: Some(Piece::Knight)
            })
        );
        assert!(matches!(MoveText::parse_uci("e2"), Err(MoveTextError::InvalidLength(_))));
        assert!(matches!(MoveText::parse_uci("e2e4qq"), Err(MoveTextError::InvalidLength(_))));
        assert!(matches!(MoveText::parse_uci("e2e9"), Err(MoveTextError::InvalidSquare(_))));
        assert!(matches!(MoveText::parse_uci("e7e8k"), Err(MoveTextError::InvalidPromotion(_))));
    }

    #[test]
    fn parse_dash_text() {
        assert_eq!(MoveText::parse_dash("O-O"), Ok(MoveText::Castle { kingside: true }));
        assert_eq!(MoveText::parse_dash("O-O-O"), Ok(MoveText::Castle { kingside: false }));
        assert_eq!(MoveText::parse_dash("0-0"), Ok(MoveText::Castle { kingside: true }));
        assert_eq!(
            MoveText::parse_dash("a2-a1r"),
            Ok(MoveText::Coordinates {
                from: sq("a2"),
                to: sq("a1"),
                promotion: Some(Piece::Rook)
            })
        );
        assert!(MoveText::parse_dash("e2e4").is_err());
        assert!(MoveText::parse_dash("e2-e").is_err());
        assert_eq!(MoveText::parse("e2-e4"), MoveText::parse("e2e4"));
    }

    #[test]
    fn text_matches_moves() {
        let castle = Move::castle(Square::E1, Square::G1);
        assert!(MoveText::parse("O-O").unwrap().matches(castle));
        assert!(MoveText::parse("e1g1").unwrap().matches(castle));
        assert!(!MoveText::parse("O-O-O").unwrap().matches(castle));

        let promo = Move::promoting(sq("c7"), sq("c8"), Piece::Bishop, false);
        assert!(MoveText::parse("c7c8b").unwrap().matches(promo));
        assert!(!MoveText::parse("c7c8").unwrap().matches(promo));
        assert!(!MoveText::parse("c7c8q").unwrap().matches(promo));
    }

    proptest::proptest! {
        #[test]
        fn decoded_moves_are_well_formed(raw in 0u32..(1 << 22)) {
            if let Some(m) = Move::from_raw(raw) {
                proptest::prop_assert_eq!(m.raw(), raw);
                let text = MoveText::parse_uci(&m.to_uci()).unwrap();
                proptest::prop_assert!(text.matches(m));
            }
        }
    }

    #[test]
    fn text_display() {
        let text = MoveText::parse("h2-h1q").unwrap();
        assert_eq!(text.to_string(), "h2h1q");
        assert_eq!(MoveText::Castle { kingside: false }.to_string(), "O-O-O");
    }
}
