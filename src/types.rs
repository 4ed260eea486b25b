use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{BOARD_SIZE, Board};

/// A disc colour, also used to name whose move it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    pub fn tile(self) -> Tile {
        match self {
            Self::Black => Tile::Black,
            Self::White => Tile::White,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => f.write_str("Black"),
            Self::White => f.write_str("White"),
        }
    }
}

/// Contents of one board cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    #[serde(rename = "E")]
    Empty,
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
}

impl Tile {
    pub fn owner(self) -> Option<Player> {
        match self {
            Self::Empty => None,
            Self::Black => Some(Player::Black),
            Self::White => Some(Player::White),
        }
    }
}

/// A cell of the hint grid: a tile, or an empty cell the side to move may play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotatedTile {
    #[serde(rename = "E")]
    Empty,
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
    #[serde(rename = "P")]
    Possible,
}

impl From<Tile> for AnnotatedTile {
    fn from(tile: Tile) -> Self {
        match tile {
            Tile::Empty => Self::Empty,
            Tile::Black => Self::Black,
            Tile::White => Self::White,
        }
    }
}

/// A board coordinate. `x` is the column, `y` the row; `y = 0` is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: u8,
    pub y: u8,
}

impl Coordinate {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(self) -> bool {
        (self.x as usize) < BOARD_SIZE && (self.y as usize) < BOARD_SIZE
    }

    /// Row-major square index. Caller contract: the coordinate is in bounds.
    pub(crate) fn index(self) -> usize {
        self.y as usize * BOARD_SIZE + self.x as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self {
            x: (index % BOARD_SIZE) as u8,
            y: (index / BOARD_SIZE) as u8,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Disc counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub black: u8,
    pub white: u8,
}

impl Score {
    pub fn of(&self, player: Player) -> u8 {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    pub fn total(&self) -> u8 {
        self.black + self.white
    }
}

/// One successfully played move. Never mutated once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub player: Player,
    pub coordinate: Coordinate,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub score_after: Score,
}

/// Read-only composite snapshot returned by `GameEngine::get_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    pub board: Board,
    pub score: Score,
    pub valid_moves: Vec<Coordinate>,
    pub is_game_over: bool,
    pub winner: Option<Player>,
    pub move_history: Vec<MoveRecord>,
    pub current_player: Player,
    pub black_player_id: Option<String>,
    pub white_player_id: Option<String>,
}
