use std::collections::HashMap;

use crate::board::Board;
use crate::types::Coordinate;

pub const DEFAULT_TT_CAPACITY: usize = 100_000;

/// How a stored score relates to the true value of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Fail-high: the true score is at least `score`.
    Lower,
    /// Fail-low: the true score is at most `score`.
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub depth: u8,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Coordinate>,
}

/// Position cache keyed by the full board (discs plus side to move), so
/// lookups never collide.
///
/// Once `capacity` entries are stored no new positions are admitted, though
/// existing ones may still be refreshed.
#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: HashMap<Board, TtEntry>,
    capacity: usize,
}

impl TranspositionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    pub fn probe(&self, board: &Board) -> Option<&TtEntry> {
        self.entries.get(board)
    }

    pub fn store(&mut self, board: Board, entry: TtEntry) {
        if self.entries.len() < self.capacity || self.entries.contains_key(&board) {
            self.entries.insert(board, entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(DEFAULT_TT_CAPACITY)
    }
}
