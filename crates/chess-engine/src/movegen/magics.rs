//! Magic bitboard tables for sliding piece attack generation.
//!
//! Each square gets a relevant-occupancy mask and a magic multiplier that
//! hashes every blocker subset of that mask to a slot in a shared attack
//! vector. Magics are discovered at startup by a seeded random search, so
//! the tables are identical on every run.

use std::sync::OnceLock;
use std::time::Instant;

use chess_core::Square;
use tracing::debug;

use crate::Bitboard;

/// Upper bound on candidates tried for a single square.
const MAX_ATTEMPTS: u32 = 100_000_000;

/// Seed for the magic search PRNG.
const SEED: u64 = 0x2545_F491_4F6C_DD1D;

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Per-square lookup parameters.
#[derive(Debug, Clone, Copy, Default)]
struct Magic {
    mask: Bitboard,
    magic: u64,
    shift: u8,
    offset: usize,
}

impl Magic {
    #[inline]
    fn index(&self, occupied: Bitboard) -> usize {
        let relevant = occupied.0 & self.mask.0;
        self.offset + (relevant.wrapping_mul(self.magic) >> self.shift) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slider {
    Rook,
    Bishop,
}

impl Slider {
    fn directions(self) -> &'static [(i8, i8); 4] {
        match self {
            Slider::Rook => &ROOK_DIRECTIONS,
            Slider::Bishop => &BISHOP_DIRECTIONS,
        }
    }

    /// Squares whose occupancy can change the attack set from `sq`.
    ///
    /// The last square of each ray never matters: it is attacked whether or
    /// not something stands on it.
    fn relevant_mask(self, sq: u8) -> Bitboard {
        let mut mask = 0u64;
        for &(dr, df) in self.directions() {
            let mut r = (sq / 8) as i8 + dr;
            let mut f = (sq % 8) as i8 + df;
            while (0..8).contains(&(r + dr)) && (0..8).contains(&(f + df)) {
                mask |= 1u64 << (r * 8 + f);
                r += dr;
                f += df;
            }
        }
        Bitboard(mask)
    }

    /// Ray-cast attacks, stopping at (and including) the first blocker.
    fn attacks_slow(self, sq: u8, blockers: Bitboard) -> Bitboard {
        let mut attacks = 0u64;
        for &(dr, df) in self.directions() {
            let mut r = (sq / 8) as i8 + dr;
            let mut f = (sq % 8) as i8 + df;
            while (0..8).contains(&r) && (0..8).contains(&f) {
                let bit = 1u64 << (r * 8 + f);
                attacks |= bit;
                if blockers.0 & bit != 0 {
                    break;
                }
                r += dr;
                f += df;
            }
        }
        Bitboard(attacks)
    }
}

/// xorshift64 generator with a fixed seed.
struct Xorshift(u64);

impl Xorshift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Candidate with few bits set.
    fn sparse(&mut self) -> u64 {
        self.next() & self.next() & self.next()
    }
}

/// Every subset of `mask`, starting with the empty set (Carry-Rippler).
fn subsets(mask: Bitboard) -> Vec<Bitboard> {
    let mut out = Vec::with_capacity(1 << mask.count());
    let mut subset = 0u64;
    loop {
        out.push(Bitboard(subset));
        subset = subset.wrapping_sub(mask.0) & mask.0;
        if subset == 0 {
            break;
        }
    }
    out
}

/// Searches for a collision-free magic and returns it with its filled table.
///
/// Two occupancies may share a slot only when they produce the same attack
/// set. Slider attacks are never empty, so an empty slot means unused.
fn find_magic(slider: Slider, sq: u8, mask: Bitboard, rng: &mut Xorshift) -> (u64, Vec<Bitboard>) {
    let bits = mask.count();
    let shift = 64 - bits;
    let occupancies = subsets(mask);
    let attacks: Vec<Bitboard> = occupancies
        .iter()
        .map(|&occ| slider.attacks_slow(sq, occ))
        .collect();
    let mut table = vec![Bitboard::EMPTY; 1 << bits];

    for _ in 0..MAX_ATTEMPTS {
        let magic = rng.sparse();
        if (mask.0.wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }

        table.fill(Bitboard::EMPTY);
        let collision_free = occupancies.iter().zip(&attacks).all(|(occ, &attack)| {
            let slot = &mut table[(occ.0.wrapping_mul(magic) >> shift) as usize];
            if slot.is_empty() {
                *slot = attack;
                true
            } else {
                *slot == attack
            }
        });

        if collision_free {
            return (magic, table);
        }
    }

    panic!(
        "no {:?} magic found for square {} after {} attempts",
        slider, sq, MAX_ATTEMPTS
    );
}

/// Rook and bishop lookup tables sharing one attack vector.
struct AttackTables {
    attacks: Vec<Bitboard>,
    rook: [Magic; 64],
    bishop: [Magic; 64],
}

impl AttackTables {
    fn build() -> Self {
        let started = Instant::now();
        let mut rng = Xorshift(SEED);
        let mut attacks = Vec::new();
        let mut rook = [Magic::default(); 64];
        let mut bishop = [Magic::default(); 64];

        for (slider, entries) in [(Slider::Rook, &mut rook), (Slider::Bishop, &mut bishop)] {
            for sq in 0..64u8 {
                let mask = slider.relevant_mask(sq);
                let (magic, table) = find_magic(slider, sq, mask, &mut rng);
                entries[sq as usize] = Magic {
                    mask,
                    magic,
                    shift: 64 - mask.count() as u8,
                    offset: attacks.len(),
                };
                attacks.extend(table);
            }
        }

        debug!(
            entries = attacks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built magic attack tables"
        );

        AttackTables {
            attacks,
            rook,
            bishop,
        }
    }
}

static ATTACK_TABLES: OnceLock<AttackTables> = OnceLock::new();

#[inline]
fn tables() -> &'static AttackTables {
    ATTACK_TABLES.get_or_init(AttackTables::build)
}

/// Builds the slider tables now instead of on first lookup.
///
/// Safe to call any number of times, from any thread.
pub fn init() {
    tables();
}

/// Returns rook attacks for a square given occupied squares.
#[inline]
pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    let tables = tables();
    tables.attacks[tables.rook[sq.index() as usize].index(occupied)]
}

/// Returns bishop attacks for a square given occupied squares.
#[inline]
pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    let tables = tables();
    tables.attacks[tables.bishop[sq.index() as usize].index(occupied)]
}

/// Returns queen attacks (bishop + rook).
#[inline]
pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    rook_attacks(sq, occupied) | bishop_attacks(sq, occupied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{File, Rank};

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    #[test]
    fn rook_mask_excludes_edges_and_origin() {
        let mask = Slider::Rook.relevant_mask(Square::A1.index());
        assert_eq!(mask.count(), 12);
        assert!(!mask.contains(Square::A1));
        assert!(!mask.contains(Square::H1));
        assert!(!mask.contains(Square::A8));

        let mask = Slider::Rook.relevant_mask(sq("d4").index());
        assert_eq!(mask.count(), 10);
    }

    #[test]
    fn bishop_mask_sizes() {
        assert_eq!(Slider::Bishop.relevant_mask(Square::A1.index()).count(), 6);
        assert_eq!(Slider::Bishop.relevant_mask(sq("d4").index()).count(), 9);
        assert_eq!(Slider::Bishop.relevant_mask(sq("b1").index()).count(), 5);
    }

    #[test]
    fn subsets_are_complete() {
        let mask = Slider::Bishop.relevant_mask(Square::A1.index());
        let all = subsets(mask);
        assert_eq!(all.len(), 64);
        assert!(all.iter().all(|s| (*s & !mask).is_empty()));
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        assert_eq!(rook_attacks(Square::A1, Bitboard::EMPTY).count(), 14);
    }

    #[test]
    fn empty_board_counts() {
        let d4 = Square::new(File::D, Rank::R4);
        assert_eq!(bishop_attacks(d4, Bitboard::EMPTY).count(), 13);
        assert_eq!(rook_attacks(d4, Bitboard::EMPTY).count(), 14);
        assert_eq!(queen_attacks(d4, Bitboard::EMPTY).count(), 27);
        assert_eq!(bishop_attacks(Square::A1, Bitboard::EMPTY).count(), 7);
    }

    #[test]
    fn blockers_stop_rays() {
        let d4 = sq("d4");
        let blockers = Bitboard::from_squares(&[sq("e5"), sq("c3"), sq("d6")]);

        let diag = bishop_attacks(d4, blockers);
        assert!(diag.contains(sq("e5")));
        assert!(diag.contains(sq("c3")));
        assert!(!diag.contains(sq("f6")));
        assert!(!diag.contains(sq("b2")));

        let lines = rook_attacks(d4, blockers);
        assert!(lines.contains(sq("d6")));
        assert!(!lines.contains(sq("d7")));
        assert!(lines.contains(sq("d1")));
    }

    #[test]
    fn lookups_match_ray_casting_for_every_subset() {
        for slider in [Slider::Rook, Slider::Bishop] {
            for index in [0u8, 7, 27, 36, 49, 63] {
                let square = Square::from_bits(index);
                for occ in subsets(slider.relevant_mask(index)) {
                    // Pieces outside the mask must not change the lookup.
                    let noisy = occ | Bitboard::from_square(Square::H8) | Bitboard::from_square(Square::A1);
                    let expected = slider.attacks_slow(index, noisy);
                    let actual = match slider {
                        Slider::Rook => rook_attacks(square, noisy),
                        Slider::Bishop => bishop_attacks(square, noisy),
                    };
                    assert_eq!(actual, expected, "{:?} on {}", slider, square);
                }
            }
        }
    }
}
