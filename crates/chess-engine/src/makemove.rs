//! Applying and reverting moves in place.
//!
//! [`Position::make_move`] validates a packed move against the board, applies
//! it, and hands back a [`MoveState`] holding everything needed to undo it.
//! [`Position::unmake_move`] consumes that record. Calls must nest: the last
//! move made is the first one unmade.

use chess_core::{Color, Move, Piece, Square};
use thiserror::Error;
use tracing::trace;

use crate::movegen::{
    bishop_attacks, generate_legal_moves, king_attacks, knight_attacks, pawn_attacks,
    queen_attacks, rook_attacks,
};
use crate::position::{CastlePath, CastlingRights};
use crate::{Bitboard, Position};

/// Undo record for one applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveState {
    /// Piece removed by the move and the square it stood on.
    pub captured: Option<(Piece, Square)>,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub side_to_move: Color,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

/// Reasons a move cannot be applied to a position.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("no {color} {piece} on {square}")]
    NoSuchPiece {
        piece: Piece,
        color: Color,
        square: Square,
    },

    #[error("{0} is occupied by a piece of the side to move")]
    OwnPieceOnTarget(Square),

    #[error("{0} is flagged as a capture but holds no enemy piece")]
    NothingToCapture(Square),

    #[error("{0} holds a piece but the move is not flagged as a capture")]
    UnflaggedCapture(Square),

    #[error("en passant onto {0} does not match the en passant target")]
    EnPassantMismatch(Square),

    #[error("no enemy pawn to take en passant on {0}")]
    NoEnPassantVictim(Square),

    #[error("{0} is not a pawn moving two squares from its starting rank")]
    InvalidDoublePush(Move),

    #[error("{0} is not a castle the side to move may make: right, rook or path missing")]
    InvalidCastle(Move),

    #[error("{0} does not follow the movement of its piece")]
    Unreachable(Move),

    #[error("{0} is not a pawn move to the last rank")]
    InvalidPromotion(Move),

    #[error("{0} reaches the last rank without promoting")]
    MissingPromotion(Move),

    #[error("{0} is not legal in this position")]
    Illegal(Move),
}

impl Position {
    /// Applies `m` for the side to move.
    ///
    /// The move is checked against the board: the piece must stand on the
    /// source square and be able to reach the target, the capture flag must
    /// match the target, and special moves need their preconditions (castling
    /// right, empty path, en passant target). King safety is not checked; see
    /// [`Position::play`]. On error the position is unchanged.
    pub fn make_move(&mut self, m: Move) -> Result<MoveState, MoveError> {
        if let Err(err) = self.check_move(m) {
            trace!(mv = %m, %err, "rejected move");
            return Err(err);
        }

        let us = self.side_to_move;
        let them = us.opposite();
        let from = m.from();
        let to = m.to();
        let piece = m.piece();

        let mut state = MoveState {
            captured: None,
            castling: self.castling,
            en_passant: self.en_passant,
            side_to_move: us,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };

        self.pieces[us.index()][piece.index()].clear(from);

        if m.is_en_passant() {
            let victim = Square::from_bits((to.index() as i8 - us.push_offset()) as u8);
            self.pieces[them.index()][Piece::Pawn.index()].clear(victim);
            state.captured = Some((Piece::Pawn, victim));
        } else if m.is_capture() {
            let taken = Piece::ALL
                .into_iter()
                .find(|p| self.pieces[them.index()][p.index()].contains(to));
            if let Some(taken) = taken {
                self.pieces[them.index()][taken.index()].clear(to);
                state.captured = Some((taken, to));
            }
        }

        let placed = m.promotion().unwrap_or(piece);
        self.pieces[us.index()][placed.index()].set(to);

        if m.is_castling() {
            let path = CastlePath::new(us, m.is_kingside_castle());
            let rooks = &mut self.pieces[us.index()][Piece::Rook.index()];
            rooks.clear(path.rook_from);
            rooks.set(path.rook_to);
        }

        if piece == Piece::King {
            self.castling.remove_color(us);
        }
        self.castling.remove_for_corner(from);
        self.castling.remove_for_corner(to);

        self.en_passant = if m.is_double_push() {
            from.offset(us.push_offset())
        } else {
            None
        };

        if piece == Piece::Pawn || state.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if us == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = them;

        self.update_occupancies();
        debug_assert_eq!(self.validate(), Ok(()));
        Ok(state)
    }

    /// Reverts `m`, which must be the last move applied with `state` as its record.
    pub fn unmake_move(&mut self, m: Move, state: &MoveState) {
        let us = state.side_to_move;
        let from = m.from();
        let to = m.to();

        let placed = m.promotion().unwrap_or(m.piece());
        self.pieces[us.index()][placed.index()].clear(to);
        self.pieces[us.index()][m.piece().index()].set(from);

        if m.is_castling() {
            let path = CastlePath::new(us, m.is_kingside_castle());
            let rooks = &mut self.pieces[us.index()][Piece::Rook.index()];
            rooks.clear(path.rook_to);
            rooks.set(path.rook_from);
        }

        if let Some((piece, sq)) = state.captured {
            self.pieces[us.opposite().index()][piece.index()].set(sq);
        }

        self.castling = state.castling;
        self.en_passant = state.en_passant;
        self.side_to_move = state.side_to_move;
        self.halfmove_clock = state.halfmove_clock;
        self.fullmove_number = state.fullmove_number;

        self.update_occupancies();
        debug_assert_eq!(self.validate(), Ok(()));
    }

    /// Applies `m` only if it is one of the legal moves of this position.
    pub fn play(&mut self, m: Move) -> Result<MoveState, MoveError> {
        if !generate_legal_moves(self).as_slice().contains(&m) {
            trace!(mv = %m, "rejected illegal move");
            return Err(MoveError::Illegal(m));
        }
        self.make_move(m)
    }

    fn check_move(&self, m: Move) -> Result<(), MoveError> {
        let us = self.side_to_move;
        let them = us.opposite();
        let from = m.from();
        let to = m.to();
        let piece = m.piece();

        if !self.pieces_of(piece, us).contains(from) {
            return Err(MoveError::NoSuchPiece {
                piece,
                color: us,
                square: from,
            });
        }
        if self.color_occupancy(us).contains(to) {
            return Err(MoveError::OwnPieceOnTarget(to));
        }

        let enemy_on_target = self.color_occupancy(them).contains(to);
        if m.is_en_passant() {
            if piece != Piece::Pawn || self.en_passant != Some(to) {
                return Err(MoveError::EnPassantMismatch(to));
            }
            if enemy_on_target {
                return Err(MoveError::UnflaggedCapture(to));
            }
            let victim = to
                .offset(-us.push_offset())
                .filter(|sq| self.pieces_of(Piece::Pawn, them).contains(*sq));
            if victim.is_none() {
                return Err(MoveError::NoEnPassantVictim(to));
            }
        } else if m.is_capture() && !enemy_on_target {
            return Err(MoveError::NothingToCapture(to));
        } else if !m.is_capture() && enemy_on_target {
            return Err(MoveError::UnflaggedCapture(to));
        }

        if m.is_double_push() {
            let start_ok = piece == Piece::Pawn
                && from.rank() == us.pawn_rank()
                && from.offset(2 * us.push_offset()) == Some(to);
            if !start_ok {
                return Err(MoveError::InvalidDoublePush(m));
            }
        }

        if m.is_castling() {
            let kingside = m.is_kingside_castle();
            let path = CastlePath::new(us, kingside);
            let castle_ok = piece == Piece::King
                && from == path.king_from
                && to == path.king_to
                && self.castling.has(us, kingside)
                && self.pieces_of(Piece::Rook, us).contains(path.rook_from)
                && (self.occupied() & path.between).is_empty();
            if !castle_ok {
                return Err(MoveError::InvalidCastle(m));
            }
        } else if !self.reachable(m).contains(to) {
            return Err(MoveError::Unreachable(m));
        }

        let reaches_last_rank = piece == Piece::Pawn && to.rank() == us.promotion_rank();
        if m.is_promotion() && !reaches_last_rank {
            return Err(MoveError::InvalidPromotion(m));
        }
        if !m.is_promotion() && reaches_last_rank {
            return Err(MoveError::MissingPromotion(m));
        }

        Ok(())
    }

    /// Squares the moved piece could land on from `m.from()`, ignoring who
    /// stands there. Castling is checked separately.
    fn reachable(&self, m: Move) -> Bitboard {
        let us = self.side_to_move;
        let from = m.from();
        let occupied = self.occupied();
        match m.piece() {
            Piece::Pawn if m.is_capture() => pawn_attacks(from, us),
            Piece::Pawn => {
                let step = from
                    .offset(us.push_offset())
                    .filter(|sq| !occupied.contains(*sq));
                let target = if m.is_double_push() {
                    step.and_then(|sq| sq.offset(us.push_offset()))
                } else {
                    step
                };
                target.map_or(Bitboard::EMPTY, Bitboard::from_square)
            }
            Piece::Knight => knight_attacks(from),
            Piece::Bishop => bishop_attacks(from, occupied),
            Piece::Rook => rook_attacks(from, occupied),
            Piece::Queen => queen_attacks(from, occupied),
            Piece::King => king_attacks(from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEN_START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn roundtrip(fen: &str, m: Move) -> Position {
        let mut pos = Position::from_fen(fen).unwrap();
        let before = pos;
        let state = pos.make_move(m).unwrap();
        let after = pos;
        pos.unmake_move(m, &state);
        assert_eq!(pos, before, "unmake of {} did not restore {}", m, fen);
        after
    }

    #[test]
    fn quiet_move_and_clocks() {
        let after = roundtrip(
            FEN_START,
            Move::quiet(sq("g1"), sq("f3"), Piece::Knight),
        );
        assert_eq!(
            after.to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1"
        );
    }

    #[test]
    fn double_push_sets_en_passant() {
        let after = roundtrip(FEN_START, Move::double_push(sq("e2"), sq("e4")));
        assert_eq!(after.en_passant, Some(sq("e3")));
        assert_eq!(after.halfmove_clock, 0);
        assert_eq!(after.side_to_move, Color::Black);
    }

    #[test]
    fn black_move_bumps_fullmove() {
        let after = roundtrip(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            Move::quiet(sq("b8"), sq("c6"), Piece::Knight),
        );
        assert_eq!(after.fullmove_number, 2);
        assert_eq!(after.en_passant, None);
    }

    #[test]
    fn en_passant_removes_victim_behind_target() {
        let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        let m = Move::en_passant(sq("e5"), sq("f6"));
        let after = roundtrip(fen, m);
        assert_eq!(after.piece_at(sq("f5")), None);
        assert_eq!(after.piece_at(sq("f6")), Some((Piece::Pawn, Color::White)));

        let mut pos = Position::from_fen(fen).unwrap();
        let state = pos.make_move(m).unwrap();
        assert_eq!(state.captured, Some((Piece::Pawn, sq("f5"))));
    }

    #[test]
    fn castling_moves_rook_and_clears_rights() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let after = roundtrip(fen, Move::castle(Square::E1, Square::G1));
        assert_eq!(after.piece_at(Square::F1), Some((Piece::Rook, Color::White)));
        assert_eq!(after.piece_at(Square::H1), None);
        assert_eq!(after.castling.to_string(), "kq");

        let after = roundtrip(fen, Move::castle(Square::E1, Square::C1));
        assert_eq!(after.piece_at(Square::D1), Some((Piece::Rook, Color::White)));
        assert_eq!(after.piece_at(Square::A1), None);
        assert_eq!(after.piece_at(Square::C1), Some((Piece::King, Color::White)));
    }

    #[test]
    fn rook_capture_on_home_square_clears_right() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let after = roundtrip(fen, Move::capture(Square::A1, Square::A8, Piece::Rook));
        assert_eq!(after.castling.to_string(), "Kk");
        assert_eq!(after.halfmove_clock, 0);
    }

    #[test]
    fn promotion_capture() {
        let fen = "1r2k3/P7/8/8/8/8/8/4K3 w - - 5 40";
        let m = Move::promoting(sq("a7"), sq("b8"), Piece::Knight, true);
        let after = roundtrip(fen, m);
        assert_eq!(after.piece_at(sq("b8")), Some((Piece::Knight, Color::White)));
        assert!(after.pieces_of(Piece::Pawn, Color::White).is_empty());
        assert!(after.pieces_of(Piece::Rook, Color::Black).is_empty());
    }

    #[test]
    fn rejects_inconsistent_moves_without_touching_state() {
        let mut pos = Position::startpos();
        let before = pos;

        assert!(matches!(
            pos.make_move(Move::quiet(sq("e4"), sq("e5"), Piece::Pawn)),
            Err(MoveError::NoSuchPiece { .. })
        ));
        assert!(matches!(
            pos.make_move(Move::quiet(sq("e7"), sq("e6"), Piece::Pawn)),
            Err(MoveError::NoSuchPiece { .. })
        ));
        assert_eq!(
            pos.make_move(Move::quiet(Square::A1, sq("a2"), Piece::Rook)),
            Err(MoveError::OwnPieceOnTarget(sq("a2")))
        );
        assert_eq!(
            pos.make_move(Move::capture(sq("e2"), sq("e3"), Piece::Pawn)),
            Err(MoveError::NothingToCapture(sq("e3")))
        );
        assert_eq!(
            pos.make_move(Move::en_passant(sq("e2"), sq("d3"))),
            Err(MoveError::EnPassantMismatch(sq("d3")))
        );
        assert!(matches!(
            pos.make_move(Move::castle(Square::E1, Square::G1)),
            Err(MoveError::OwnPieceOnTarget(_))
        ));
        assert_eq!(pos, before);
    }

    #[test]
    fn rejects_bad_special_moves() {
        let mut pos = Position::from_fen("4k3/P7/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        let before = pos;

        let m = Move::quiet(sq("a7"), sq("a8"), Piece::Pawn);
        assert_eq!(pos.make_move(m), Err(MoveError::MissingPromotion(m)));

        let m = Move::promoting(sq("e2"), sq("e3"), Piece::Queen, false);
        assert_eq!(pos.make_move(m), Err(MoveError::InvalidPromotion(m)));

        let m = Move::double_push(sq("e2"), sq("e3"));
        assert_eq!(pos.make_move(m), Err(MoveError::InvalidDoublePush(m)));

        let m = Move::castle(Square::E1, Square::G1);
        assert_eq!(pos.make_move(m), Err(MoveError::InvalidCastle(m)));

        assert_eq!(pos, before);

        let mut pos = Position::from_fen("4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1").unwrap();
        let m = Move::quiet(sq("e2"), sq("e3"), Piece::Pawn);
        assert_eq!(pos.make_move(m), Err(MoveError::UnflaggedCapture(sq("e3"))));
    }

    #[test]
    fn castle_needs_right_and_clear_path() {
        let short = Move::castle(Square::E1, Square::G1);
        let long = Move::castle(Square::E1, Square::C1);

        for fen in [
            "4k3/8/8/8/8/8/8/4Kb1R w K - 0 1",
            "4k3/8/8/8/8/8/8/4KB1R w K - 0 1",
            "4k3/8/8/8/8/8/8/4K2R w - - 0 1",
            "4k3/8/8/8/8/8/8/4K2R w Q - 0 1",
        ] {
            let mut pos = Position::from_fen(fen).unwrap();
            let before = pos;
            assert_eq!(pos.make_move(short), Err(MoveError::InvalidCastle(short)), "{}", fen);
            assert_eq!(pos, before);
        }

        for fen in [
            "4k3/8/8/8/8/8/8/R2bK3 w Q - 0 1",
            "4k3/8/8/8/8/8/8/Rn2K3 w Q - 0 1",
            "4k3/8/8/8/8/8/8/R3K3 w K - 0 1",
        ] {
            let mut pos = Position::from_fen(fen).unwrap();
            let before = pos;
            assert_eq!(pos.make_move(long), Err(MoveError::InvalidCastle(long)), "{}", fen);
            assert_eq!(pos, before);
        }
    }

    #[test]
    fn rejects_moves_the_piece_cannot_make() {
        let mut pos = Position::from_fen("4k3/8/8/3p4/8/8/4P3/R3K2N w Q - 0 1").unwrap();
        let before = pos;

        let cases = [
            Move::quiet(Square::E1, Square::G1, Piece::King),
            Move::quiet(Square::H1, sq("h3"), Piece::Knight),
            Move::quiet(Square::A1, sq("b2"), Piece::Rook),
            Move::quiet(sq("e2"), sq("e5"), Piece::Pawn),
            Move::quiet(sq("e2"), sq("d3"), Piece::Pawn),
            Move::quiet(sq("e2"), sq("e4"), Piece::Pawn),
            Move::capture(sq("e2"), sq("d5"), Piece::Pawn),
        ];
        for m in cases {
            assert_eq!(pos.make_move(m), Err(MoveError::Unreachable(m)));
        }
        assert_eq!(pos, before);

        let mut pos = Position::from_fen("4k3/8/8/8/8/4n3/4P3/R3K3 w - - 0 1").unwrap();
        let before = pos;
        let m = Move::double_push(sq("e2"), sq("e4"));
        assert_eq!(pos.make_move(m), Err(MoveError::Unreachable(m)));
        let m = Move::capture(Square::A1, sq("a8"), Piece::Rook);
        assert_eq!(pos.make_move(m), Err(MoveError::NothingToCapture(sq("a8"))));
        assert_eq!(pos, before);
    }

    #[test]
    fn en_passant_must_come_from_an_adjacent_file() {
        let mut pos = Position::from_fen("4k3/8/8/1P1p4/8/8/8/4K3 w - d6 0 1").unwrap();
        let before = pos;
        let m = Move::en_passant(sq("b5"), sq("d6"));
        assert_eq!(pos.make_move(m), Err(MoveError::Unreachable(m)));
        assert_eq!(pos, before);
    }

    #[test]
    fn clocks_saturate() {
        let fen = format!("4k3/8/8/8/8/8/8/4K3 b - - {} {}", u32::MAX, u32::MAX);
        let mut pos = Position::from_fen(&fen).unwrap();
        pos.make_move(Move::quiet(Square::E8, sq("d8"), Piece::King)).unwrap();
        assert_eq!(pos.halfmove_clock, u32::MAX);
        assert_eq!(pos.fullmove_number, u32::MAX);
    }

    #[test]
    fn error_messages_name_the_move() {
        let err = MoveError::NoSuchPiece {
            piece: Piece::Pawn,
            color: Color::White,
            square: sq("e4"),
        };
        assert_eq!(err.to_string(), "no White Pawn on e4");
        let m = Move::quiet(Square::E1, Square::G1, Piece::King);
        assert!(MoveError::Unreachable(m).to_string().starts_with("e1g1"));
    }

    #[test]
    fn en_passant_requires_victim() {
        let mut pos = Position::from_fen("4k3/8/8/4P3/8/8/8/4K3 w - d6 0 1").unwrap();
        let m = Move::en_passant(sq("e5"), sq("d6"));
        assert_eq!(pos.make_move(m), Err(MoveError::NoEnPassantVictim(sq("d6"))));
    }

    #[test]
    fn play_rejects_moves_that_leave_king_in_check() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        let m = Move::quiet(Square::E1, sq("d2"), Piece::King);
        let mut scratch = pos;
        assert!(scratch.make_move(m).is_ok());
        assert_eq!(pos.play(m), Err(MoveError::Illegal(m)));

        let m = Move::capture(Square::E1, sq("e2"), Piece::King);
        assert!(pos.play(m).is_ok());
        assert_eq!(pos.side_to_move, Color::Black);
    }

    #[test]
    fn nested_unmake_restores_start() {
        let mut pos = Position::startpos();
        let line = [
            Move::double_push(sq("e2"), sq("e4")),
            Move::double_push(sq("d7"), sq("d5")),
            Move::capture(sq("e4"), sq("d5"), Piece::Pawn),
            Move::capture(Square::D8, sq("d5"), Piece::Queen),
        ];

        let mut stack = Vec::new();
        for m in &line {
            stack.push((*m, pos.make_move(*m).unwrap()));
        }
        assert_eq!(pos.to_fen(), "rnb1kbnr/ppp1pppp/8/3q4/8/8/PPPP1PPP/RNBQKBNR w KQkq - 0 3");
        while let Some((m, state)) = stack.pop() {
            pos.unmake_move(m, &state);
        }
        assert_eq!(pos, Position::startpos());
    }
}
