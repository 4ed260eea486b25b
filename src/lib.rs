pub mod ai;
pub mod board;
pub mod error;
pub mod game;
pub mod opening_book;
pub mod time_control;
pub mod types;
pub mod wasm;

pub use ai::{Bot, BotConfig, Difficulty};
pub use board::Board;
pub use error::{OthelloError, Result};
pub use game::{GameEngine, GameEvent, GameEventKind, GameOptions, MoveSelector};
pub use time_control::{TimeControlConfig, TimeControlManager};
pub use types::{Coordinate, GameState, MoveRecord, Player, Score, Tile};
