//! Transposition table keyed by Zobrist hash.
//!
//! Fixed size, one entry per slot, always-replace. The slots sit behind a
//! `Mutex` so the table can live in an `Arc` shared between the UCI loop and
//! the search thread.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chess_core::Move;

/// How the stored score relates to the true value of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Failed high: true score is at least `score`.
    Lower,
    /// Failed low: true score is at most `score`.
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub key: u64,
    pub depth: u32,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

pub struct TranspositionTable {
    slots: Mutex<Vec<Option<TtEntry>>>,
}

impl TranspositionTable {
    /// Creates a table using about `mb` MiB.
    pub fn new(mb: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; Self::capacity_for(mb)]),
        }
    }

    fn capacity_for(mb: usize) -> usize {
        (mb * 1024 * 1024 / std::mem::size_of::<Option<TtEntry>>()).max(1)
    }

    // A panic while holding the lock cannot leave a slot half-written, so a
    // poisoned table is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<Option<TtEntry>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.lock().len()
    }

    /// Reallocates to about `mb` MiB, dropping every entry.
    pub fn resize(&self, mb: usize) {
        *self.lock() = vec![None; Self::capacity_for(mb)];
    }

    pub fn clear(&self) {
        self.lock().fill(None);
    }

    /// Returns the entry stored for `key`, if the slot holds that key.
    pub fn lookup(&self, key: u64) -> Option<TtEntry> {
        let slots = self.lock();
        let index = (key % slots.len() as u64) as usize;
        slots[index].filter(|entry| entry.key == key)
    }

    pub fn store(&self, entry: TtEntry) {
        let mut slots = self.lock();
        let index = (entry.key % slots.len() as u64) as usize;
        slots[index] = Some(entry);
    }

    /// Occupancy in permille, sampled over the first thousand slots.
    pub fn hashfull(&self) -> u32 {
        let slots = self.lock();
        let sample = slots.len().min(1000);
        let used = slots[..sample].iter().filter(|s| s.is_some()).count();
        (used * 1000 / sample) as u32
    }
}
