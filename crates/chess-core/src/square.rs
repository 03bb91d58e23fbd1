//! Board coordinates.

use std::fmt;
use std::str::FromStr;

/// Defines a board axis: eight variants, indexed 0-7, written with
/// consecutive characters starting at `$first`.
macro_rules! axis {
    ($(#[$meta:meta])* $name:ident, $first:literal, [$($variant:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every value, lowest index first.
            pub const ALL: [$name; 8] = [$($name::$variant),+];

            #[inline]
            pub const fn from_index(index: u8) -> Option<Self> {
                if index < 8 {
                    Some(Self::ALL[index as usize])
                } else {
                    None
                }
            }

            #[inline]
            pub const fn from_char(c: char) -> Option<Self> {
                let offset = (c as u32).wrapping_sub($first as u32);
                if offset < 8 {
                    Some(Self::ALL[offset as usize])
                } else {
                    None
                }
            }

            #[inline]
            pub const fn index(self) -> u8 {
                self as u8
            }

            #[inline]
            pub const fn to_char(self) -> char {
                ($first as u8 + self as u8) as char
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_char())
            }
        }
    };
}

axis!(
    /// A file (column), written `a` through `h`.
    File, 'a', [A, B, C, D, E, F, G, H]
);

axis!(
    /// A rank (row), written `1` through `8`.
    Rank, '1', [R1, R2, R3, R4, R5, R6, R7, R8]
);

/// A square, indexed 0-63 in little-endian rank-file order
/// (a1 = 0, h1 = 7, a8 = 56, h8 = 63).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    #[inline]
    pub const fn new(file: File, rank: Rank) -> Self {
        Square(rank.index() * 8 + file.index())
    }

    /// Creates a square from index (0-63).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    /// Creates a square from the low six bits of `bits`.
    ///
    /// Used where the index is known to be in range (bit scans, packed moves).
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        debug_assert!(bits < 64);
        Square(bits & 0x3F)
    }

    /// Parses algebraic notation such as `e4`.
    pub const fn from_algebraic(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = match File::from_char(bytes[0] as char) {
            Some(f) => f,
            None => return None,
        };
        let rank = match Rank::from_char(bytes[1] as char) {
            Some(r) => r,
            None => return None,
        };
        Some(Square::new(file, rank))
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn file(self) -> File {
        File::ALL[(self.0 % 8) as usize]
    }

    #[inline]
    pub const fn rank(self) -> Rank {
        Rank::ALL[(self.0 / 8) as usize]
    }

    /// Returns the square `delta` indices away, or `None` off the board.
    ///
    /// Only rank wrap is detected; callers moving sideways must check files.
    #[inline]
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let target = self.0 as i16 + delta as i16;
        if target >= 0 && target < 64 {
            Some(Square(target as u8))
        } else {
            None
        }
    }

    /// Returns the algebraic notation for this square.
    pub fn to_algebraic(self) -> String {
        format!("{}{}", self.file(), self.rank())
    }

    /// Returns a raw bitboard with only this square set.
    #[inline]
    pub const fn bitboard(self) -> u64 {
        1u64 << self.0
    }

    pub const A1: Square = Square(0);
    pub const B1: Square = Square(1);
    pub const C1: Square = Square(2);
    pub const D1: Square = Square(3);
    pub const E1: Square = Square(4);
    pub const F1: Square = Square(5);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A8: Square = Square(56);
    pub const B8: Square = Square(57);
    pub const C8: Square = Square(58);
    pub const D8: Square = Square(59);
    pub const E8: Square = Square(60);
    pub const F8: Square = Square(61);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);
}

impl FromStr for Square {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::from_algebraic(s).ok_or_else(|| format!("invalid square '{}'", s))
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({})", self.to_algebraic())
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_characters() {
        assert_eq!(File::from_char('a'), Some(File::A));
        assert_eq!(File::from_char('h'), Some(File::H));
        assert_eq!(File::from_char('i'), None);
        assert_eq!(File::from_char('A'), None);
        assert_eq!(Rank::from_char('8'), Some(Rank::R8));
        assert_eq!(Rank::from_char('0'), None);
        assert_eq!(Rank::R3.to_char(), '3');
        assert_eq!(File::from_index(8), None);
    }

    #[test]
    fn square_new() {
        let e4 = Square::new(File::E, Rank::R4);
        assert_eq!(e4.file(), File::E);
        assert_eq!(e4.rank(), Rank::R4);
        assert_eq!(e4.index(), 28);
    }

    #[test]
    fn square_from_algebraic() {
        assert_eq!(Square::from_algebraic("a1"), Some(Square::A1));
        assert_eq!(Square::from_algebraic("h8"), Some(Square::H8));
        assert_eq!(Square::from_algebraic("i1"), None);
        assert_eq!(Square::from_algebraic("a9"), None);
        assert_eq!(Square::from_algebraic("A1"), None);
        assert_eq!(Square::from_algebraic(""), None);
        assert_eq!("e4".parse::<Square>(), Ok(Square::new(File::E, Rank::R4)));
        assert!("z0".parse::<Square>().is_err());
    }

    #[test]
    fn square_offset() {
        assert_eq!(Square::E1.offset(8), Square::from_algebraic("e2"));
        assert_eq!(Square::A1.offset(-1), None);
        assert_eq!(Square::H8.offset(1), None);
    }

    #[test]
    fn square_display() {
        assert_eq!(Square::A1.to_string(), "a1");
        assert_eq!(format!("{:?}", Square::H8), "Square(h8)");
    }

    #[test]
    fn every_index_roundtrips_through_algebraic() {
        for i in 0..64 {
            let sq = Square::from_index(i).unwrap();
            assert_eq!(Square::from_algebraic(&sq.to_algebraic()), Some(sq));
        }
        assert_eq!(Square::from_index(64), None);
    }
}
