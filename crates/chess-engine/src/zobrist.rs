//! Zobrist hashing for position identification.
//!
//! A position's key is the XOR of one random number per (piece, color,
//! square) occupant, one for Black to move, one per castling right held and
//! one for the file of the en passant target.

use chess_core::{Color, Piece, Square};

use crate::Position;

/// Zobrist hash keys, generated at compile time from a fixed seed.
pub(crate) struct ZobristKeys {
    /// Keys for pieces: `[piece][color][square]`.
    pieces: [[[u64; 64]; 2]; 6],
    black_to_move: u64,
    /// One key per castling flag bit.
    castling: [u64; 4],
    en_passant: [u64; 8],
}

impl ZobristKeys {
    const fn new() -> Self {
        const fn next_random(state: u64) -> u64 {
            let mut x = state;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        }

        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        let mut pieces = [[[0u64; 64]; 2]; 6];
        let mut castling = [0u64; 4];
        let mut en_passant = [0u64; 8];

        let mut piece = 0;
        while piece < 6 {
            let mut color = 0;
            while color < 2 {
                let mut square = 0;
                while square < 64 {
                    state = next_random(state);
                    pieces[piece][color][square] = state;
                    square += 1;
                }
                color += 1;
            }
            piece += 1;
        }

        state = next_random(state);
        let black_to_move = state;

        let mut i = 0;
        while i < 4 {
            state = next_random(state);
            castling[i] = state;
            i += 1;
        }

        let mut i = 0;
        while i < 8 {
            state = next_random(state);
            en_passant[i] = state;
            i += 1;
        }

        ZobristKeys {
            pieces,
            black_to_move,
            castling,
            en_passant,
        }
    }

    #[inline]
    pub const fn piece_key(&self, piece: Piece, color: Color, square: Square) -> u64 {
        self.pieces[piece.index()][color.index()][square.index() as usize]
    }
}

/// Global Zobrist keys (initialized at compile time).
pub(crate) static ZOBRIST: ZobristKeys = ZobristKeys::new();

impl Position {
    /// Computes the Zobrist key of this position from scratch.
    pub fn zobrist_hash(&self) -> u64 {
        let mut hash = 0u64;
        for color in Color::ALL {
            for piece in Piece::ALL {
                for sq in self.pieces_of(piece, color) {
                    hash ^= ZOBRIST.piece_key(piece, color, sq);
                }
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= ZOBRIST.black_to_move;
        }
        for (bit, key) in ZOBRIST.castling.iter().enumerate() {
            if self.castling.raw() & (1 << bit) != 0 {
                hash ^= key;
            }
        }
        if let Some(ep) = self.en_passant {
            hash ^= ZOBRIST.en_passant[ep.file().index() as usize];
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_keys_are_distinct() {
        let key1 = ZOBRIST.piece_key(Piece::Pawn, Color::White, Square::A1);
        let key2 = ZOBRIST.piece_key(Piece::Pawn, Color::White, Square::B1);
        let key3 = ZOBRIST.piece_key(Piece::Pawn, Color::Black, Square::A1);
        let key4 = ZOBRIST.piece_key(Piece::Knight, Color::White, Square::A1);

        assert_ne!(key1, key2);
        assert_ne!(key1, key3);
        assert_ne!(key1, key4);
        assert_ne!(ZOBRIST.black_to_move, 0);
    }

    #[test]
    fn hash_tracks_every_state_field() {
        let base = Position::from_fen("r3k2r/8/8/3pP3/8/8/8/R3K2R w KQkq d6 0 1").unwrap();
        let variants = [
            "r3k2r/8/8/3pP3/8/8/8/R3K2R b KQkq d6 0 1",
            "r3k2r/8/8/3pP3/8/8/8/R3K2R w Kkq d6 0 1",
            "r3k2r/8/8/3pP3/8/8/8/R3K2R w KQkq - 0 1",
            "r3k2r/8/8/3pP3/8/8/8/R2K3R w KQkq d6 0 1",
        ];
        for fen in variants {
            assert_ne!(
                Position::from_fen(fen).unwrap().zobrist_hash(),
                base.zobrist_hash(),
                "{}",
                fen
            );
        }
    }

    #[test]
    fn clocks_do_not_affect_hash() {
        let a = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let b = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 17 60").unwrap();
        assert_eq!(a.zobrist_hash(), b.zobrist_hash());
    }

    #[test]
    fn transposition_gives_same_hash() {
        use chess_core::Move;
        let sq = |s: &str| Square::from_algebraic(s).unwrap();
        let mut a = Position::startpos();
        let mut b = Position::startpos();
        for m in [
            Move::quiet(sq("g1"), sq("f3"), Piece::Knight),
            Move::quiet(sq("g8"), sq("f6"), Piece::Knight),
            Move::quiet(sq("b1"), sq("c3"), Piece::Knight),
        ] {
            a.make_move(m).unwrap();
        }
        for m in [
            Move::quiet(sq("b1"), sq("c3"), Piece::Knight),
            Move::quiet(sq("g8"), sq("f6"), Piece::Knight),
            Move::quiet(sq("g1"), sq("f3"), Piece::Knight),
        ] {
            b.make_move(m).unwrap();
        }
        assert_eq!(a.zobrist_hash(), b.zobrist_hash());
    }
}
