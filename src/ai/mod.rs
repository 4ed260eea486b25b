pub mod bot;
pub mod eval;
pub mod search;
pub mod tt;

pub use bot::{Bot, BotConfig, Difficulty};
