//! FEN (Forsyth-Edwards Notation) field parsing.

use crate::{Color, Piece, Square};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("FEN needs 4 or 6 space-separated fields, found {0}")]
    InvalidPartCount(usize),

    #[error("bad piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("side to move must be 'w' or 'b', not '{0}'")]
    InvalidActiveColor(String),

    #[error("bad en passant field '{0}'")]
    InvalidEnPassantSquare(String),

    #[error("bad halfmove clock '{0}'")]
    InvalidHalfmoveClock(String),

    #[error("bad fullmove number '{0}'")]
    InvalidFullmoveNumber(String),
}

/// Occupant of each square, indexed a1 = 0 .. h8 = 63.
pub type Placement = [Option<(Piece, Color)>; 64];

/// The FEN fields, validated and decoded.
///
/// The engine turns this into its bitboard position; nothing here knows
/// about bitboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenParser {
    pub placement: Placement,
    pub active_color: Color,
    /// Castling letters that were recognized, in `KQkq` order.
    pub castling: String,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl FenParser {
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Splits and checks a FEN record.
    ///
    /// The two clock fields may be omitted (EPD style); they then default to
    /// `0` and `1`.
    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let [board, side, castling, ep, clocks @ ..] = fields.as_slice() else {
            return Err(FenError::InvalidPartCount(fields.len()));
        };
        let (halfmove_clock, fullmove_number) = match clocks {
            [] => (0, 1),
            [half, full] => (
                number(half, FenError::InvalidHalfmoveClock)?,
                number(full, FenError::InvalidFullmoveNumber)?,
            ),
            _ => return Err(FenError::InvalidPartCount(fields.len())),
        };

        let active_color = match *side {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidActiveColor(other.to_string())),
        };

        let en_passant = if *ep == "-" {
            None
        } else {
            let square = Square::from_algebraic(ep)
                .ok_or_else(|| FenError::InvalidEnPassantSquare(ep.to_string()))?;
            Some(square)
        };

        Ok(FenParser {
            placement: read_placement(board)?,
            active_color,
            // Unknown letters are dropped rather than rejected.
            castling: "KQkq".chars().filter(|c| castling.contains(*c)).collect(),
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// Writes the piece-placement field for an arbitrary square lookup.
    pub fn write_placement(occupant: impl Fn(Square) -> Option<(Piece, Color)>) -> String {
        let mut rows = Vec::with_capacity(8);
        for rank in (0..8u8).rev() {
            let mut row = String::new();
            let mut gap = 0;
            for file in 0..8u8 {
                let Some((piece, color)) = occupant(Square::from_bits(rank * 8 + file)) else {
                    gap += 1;
                    continue;
                };
                if gap > 0 {
                    row.push_str(&gap.to_string());
                    gap = 0;
                }
                row.push(piece.to_fen_char(color));
            }
            if gap > 0 {
                row.push_str(&gap.to_string());
            }
            rows.push(row);
        }
        rows.join("/")
    }

    pub fn to_fen(&self) -> String {
        let castling = if self.castling.is_empty() { "-" } else { self.castling.as_str() };
        let en_passant = self.en_passant.map_or_else(|| "-".to_string(), Square::to_algebraic);
        format!(
            "{} {} {} {} {} {}",
            Self::write_placement(|sq| self.placement[sq.index() as usize]),
            self.active_color.to_fen_char(),
            castling,
            en_passant,
            self.halfmove_clock,
            self.fullmove_number,
        )
    }
}

impl Default for FenParser {
    fn default() -> Self {
        Self::parse(Self::STARTPOS).expect("STARTPOS is valid")
    }
}

fn number<T: FromStr>(field: &str, err: fn(String) -> FenError) -> Result<T, FenError> {
    field.parse().map_err(|_| err(field.to_string()))
}

/// Reads the first field, rank 8 first, into a1-indexed squares.
fn read_placement(board: &str) -> Result<Placement, FenError> {
    let invalid = |msg: String| FenError::InvalidPiecePlacement(msg);
    let rows: Vec<&str> = board.split('/').collect();
    if rows.len() != 8 {
        return Err(invalid(format!("{} ranks instead of 8", rows.len())));
    }

    let mut squares = [None; 64];
    for (row, rank) in rows.iter().zip((0..8usize).rev()) {
        let mut file = 0usize;
        for c in row.chars() {
            match c {
                '1'..='8' => file += c as usize - '0' as usize,
                _ => {
                    let occupant = Piece::from_fen_char(c).ok_or_else(|| {
                        invalid(format!("unexpected '{}' on rank {}", c, rank + 1))
                    })?;
                    if file < 8 {
                        squares[rank * 8 + file] = Some(occupant);
                    }
                    file += 1;
                }
            }
        }
        if file != 8 {
            return Err(invalid(format!("rank {} covers {} files", rank + 1, file)));
        }
    }

    Ok(squares)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_BOARD: &str = "8/8/8/8/8/8/8/8";

    fn with_board_fields(rest: &str) -> Result<FenParser, FenError> {
        FenParser::parse(&format!("{} {}", EMPTY_BOARD, rest))
    }

    #[test]
    fn startpos_fields() {
        let fen = FenParser::default();
        assert_eq!(fen.active_color, Color::White);
        assert_eq!(fen.castling, "KQkq");
        assert_eq!(fen.en_passant, None);
        assert_eq!((fen.halfmove_clock, fen.fullmove_number), (0, 1));
        assert_eq!(fen.placement[4], Some((Piece::King, Color::White)));
        assert_eq!(fen.placement[59], Some((Piece::Queen, Color::Black)));
        assert_eq!(fen.placement[28], None);
        assert_eq!(fen.to_fen(), FenParser::STARTPOS);
    }

    #[test]
    fn writes_back_what_it_read() {
        for text in [
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 12 40",
        ] {
            assert_eq!(FenParser::parse(text).unwrap().to_fen(), text);
        }
    }

    #[test]
    fn clocks_may_be_omitted() {
        let fen = FenParser::parse("8/8/8/8/8/8/8/K6k w - -").unwrap();
        assert_eq!((fen.halfmove_clock, fen.fullmove_number), (0, 1));
    }

    #[test]
    fn field_count() {
        assert_eq!(FenParser::parse("invalid"), Err(FenError::InvalidPartCount(1)));
        assert_eq!(with_board_fields("w - - 0"), Err(FenError::InvalidPartCount(5)));
        assert_eq!(with_board_fields("w - - 0 1 2"), Err(FenError::InvalidPartCount(7)));
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = [
            ("x KQkq - 0 1", FenError::InvalidActiveColor("x".into())),
            ("w - abc 0 1", FenError::InvalidEnPassantSquare("abc".into())),
            ("b - x3 0 1", FenError::InvalidEnPassantSquare("x3".into())),
            ("w - - abc 1", FenError::InvalidHalfmoveClock("abc".into())),
            ("w - - -1 1", FenError::InvalidHalfmoveClock("-1".into())),
            ("w - - 0 xyz", FenError::InvalidFullmoveNumber("xyz".into())),
        ];
        for (rest, expected) in cases {
            assert_eq!(with_board_fields(rest), Err(expected), "{}", rest);
        }
    }

    #[test]
    fn rejects_bad_placement() {
        for board in [
            "8/8/8/8/8/8/8",
            "8/8/8/8/8/8/8/8/8",
            "rnbqkbnrr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR",
            "7/8/8/8/8/8/8/8",
            "09/8/8/8/8/8/8/8",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPXPPP/RNBQKBNR",
        ] {
            assert!(
                matches!(
                    FenParser::parse(&format!("{} w - - 0 1", board)),
                    Err(FenError::InvalidPiecePlacement(_))
                ),
                "{}",
                board
            );
        }
        assert!(FenParser::parse("44/8/8/8/8/8/8/8 w - - 0 1").is_ok());
    }

    #[test]
    fn unknown_castling_letters_are_ignored() {
        assert_eq!(with_board_fields("w XqYK - 0 1").unwrap().castling, "Kq");
        let fen = with_board_fields("w - - 0 1").unwrap();
        assert_eq!(fen.castling, "");
        assert!(fen.to_fen().contains(" w - - "));
    }

    #[test]
    fn en_passant_square() {
        let fen = with_board_fields("b - d6 0 1").unwrap();
        assert_eq!(fen.en_passant, Square::from_algebraic("d6"));
    }

    #[test]
    fn error_messages_name_the_bad_input() {
        assert!(FenError::InvalidPartCount(3).to_string().contains('3'));
        assert!(FenError::InvalidActiveColor("x".into()).to_string().contains('x'));
        assert!(FenError::InvalidEnPassantSquare("z9".into()).to_string().contains("z9"));
    }
}
