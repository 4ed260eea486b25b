use thiserror::Error;

use crate::types::{Coordinate, Player};

pub type Result<T> = std::result::Result<T, OthelloError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OthelloError {
    /// Either axis lies outside `0..8`.
    #[error("out of bounds: ({x}, {y}) is not on the board")]
    OutOfBounds { x: u8, y: u8 },

    #[error("cannot place a piece on the occupied square {0}")]
    Occupied(Coordinate),

    #[error("move at {0} does not flip any opponent pieces")]
    NoFlips(Coordinate),

    #[error("game is already over")]
    GameOver,

    #[error("{0} ran out of time")]
    TimeOut(Player),

    #[error("invalid move notation {notation:?}: {reason}")]
    InvalidNotation { notation: String, reason: String },

    /// Imported state failed validation.
    #[error("corrupt game state: {0}")]
    CorruptState(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for OthelloError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
