//! Static Othello opening book.
//!
//! Keys are comma-joined move notations (`"f4,d3,c6"`), the empty string being
//! the starting position. Notation uses column letters `a..h` for `x = 0..7`
//! and row digit `8 - y`, so `y = 0` (the top row of the engine grid) is row 8.
//!
//! The table is generated once from a short list of named lines, each expanded
//! over the four board symmetries that preserve the starting position. Every
//! prefix of every line becomes a key whose best move is the line's next move;
//! when two lines share a prefix the earlier line wins.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::board::BOARD_SIZE;
use crate::error::{OthelloError, Result};
use crate::types::Coordinate;

/// Canonical lines, all starting with Black's f4.
const NAMED_LINES: &[(&str, &str)] = &[
    ("Perpendicular", "f4 d3"),
    ("Diagonal", "f4 f3"),
    ("Parallel", "f4 f5"),
    ("Tiger", "f4 d3 c6 d6 c5"),
    ("Stephenson", "f4 d3 c6 d6 c5 f5 c4 b6 c7"),
    ("Brightwell", "f4 d3 c6 d6 c5 f5 f3"),
    ("Cow", "f4 d3 c4 f5 e6"),
    ("Rose", "f4 d3 c4 f5 e6 f3 g4 e3 e2"),
    ("Inoue", "f4 d3 c4 f5 e6 c3 d6"),
    ("Snake", "f4 d3 c5 d6 c6"),
    ("Buffalo", "f4 f3 e3 f5 c6"),
    ("Heath", "f4 f3 e3 f5 g4"),
    ("Rabbit", "f4 f3 e3 f5 e6"),
    ("Mouse", "f4 f5 e6 f3 d6"),
];

const LAST: u8 = BOARD_SIZE as u8 - 1;

/// Name given to the empty history, after its book reply.
const ROOT_NAME: &str = "Standard Opening (f4)";

/// Identity, half turn, main-diagonal and anti-diagonal reflection.
const SYMMETRIES: [fn(Coordinate) -> Coordinate; 4] = [
    |c: Coordinate| c,
    |c: Coordinate| Coordinate::new(LAST - c.x, LAST - c.y),
    |c: Coordinate| Coordinate::new(c.y, c.x),
    |c: Coordinate| Coordinate::new(LAST - c.y, LAST - c.x),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookEntry {
    pub best_move: Option<Coordinate>,
    pub name: Option<&'static str>,
}

static OPENING_BOOK: Lazy<HashMap<String, BookEntry>> = Lazy::new(build_book);

pub fn move_to_notation(coord: Coordinate) -> String {
    format!("{}{}", (b'a' + coord.x) as char, BOARD_SIZE as u8 - coord.y)
}

pub fn notation_to_move(notation: &str) -> Result<Coordinate> {
    let invalid = |reason: &str| OthelloError::InvalidNotation {
        notation: notation.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = notation.chars();
    let column = chars
        .next()
        .ok_or_else(|| invalid("expected a column letter and a row digit, e.g. \"d3\""))?
        .to_ascii_lowercase();
    if !('a'..='h').contains(&column) {
        return Err(invalid("column must be between \"a\" and \"h\""));
    }

    let row: u8 = chars
        .as_str()
        .parse()
        .map_err(|_| invalid("row must be a number between 1 and 8"))?;
    if !(1..=BOARD_SIZE as u8).contains(&row) {
        return Err(invalid("row must be a number between 1 and 8"));
    }

    Ok(Coordinate::new(column as u8 - b'a', BOARD_SIZE as u8 - row))
}

/// Comma-joined notation of `moves`; the empty history maps to `""`.
pub fn sequence_key(moves: &[Coordinate]) -> String {
    moves
        .iter()
        .map(|&coord| move_to_notation(coord))
        .collect::<Vec<_>>()
        .join(",")
}

/// Book reply for the position reached by `history`.
pub fn lookup(history: &[Coordinate]) -> Option<Coordinate> {
    OPENING_BOOK
        .get(&sequence_key(history))
        .and_then(|entry| entry.best_move)
}

/// Name of the opening reached by `history`.
pub fn opening_name(history: &[Coordinate]) -> Option<&'static str> {
    OPENING_BOOK
        .get(&sequence_key(history))
        .and_then(|entry| entry.name)
}

/// Number of positions in the book.
pub fn book_size() -> usize {
    OPENING_BOOK.len()
}

fn build_book() -> HashMap<String, BookEntry> {
    let mut book: HashMap<String, BookEntry> = HashMap::new();

    for &(name, line) in NAMED_LINES {
        let moves = match line
            .split_whitespace()
            .map(notation_to_move)
            .collect::<Result<Vec<_>>>()
        {
            Ok(moves) => moves,
            Err(err) => {
                log::error!("skipping opening line {name}: {err}");
                continue;
            }
        };

        for symmetry in SYMMETRIES {
            let oriented: Vec<Coordinate> = moves.iter().map(|&mv| symmetry(mv)).collect();
            for played in 0..=oriented.len() {
                let entry = book.entry(sequence_key(&oriented[..played])).or_default();
                if entry.best_move.is_none() {
                    entry.best_move = oriented.get(played).copied();
                }
            }
            if let Some(entry) = book.get_mut(&sequence_key(&oriented)) {
                entry.name = Some(name);
            }
        }
    }

    if let Some(root) = book.get_mut("") {
        root.name = Some(ROOT_NAME);
    }

    // Unnamed prefixes inherit the name of their longest named ancestor.
    let mut keys: Vec<String> = book.keys().cloned().collect();
    keys.sort_by_key(|key| key.len());
    for key in keys {
        let inherited = match key.rfind(',') {
            Some(split) => book.get(&key[..split]).and_then(|parent| parent.name),
            // First moves come in four orientations, so none shares the root's name.
            None => None,
        };
        if let Some(entry) = book.get_mut(&key)
            && entry.name.is_none()
        {
            entry.name = inherited;
        }
    }

    book
}
