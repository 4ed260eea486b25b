use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::ai::search::Searcher;
use crate::ai::tt::{DEFAULT_TT_CAPACITY, TranspositionTable};
use crate::board::Board;
use crate::game::MoveSelector;
use crate::opening_book;
use crate::time_control::millis_opt;
use crate::types::{Coordinate, Player};

/// Opening book is only consulted while fewer moves than this have been played.
const BOOK_MOVE_LIMIT: usize = 12;
const DEFAULT_SEARCH_DEPTH: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Uniformly random legal move.
    Easy,
    /// Greedy one-ply disc maximiser.
    #[default]
    Medium,
    /// Alpha-beta search with opening book.
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub difficulty: Difficulty,
    pub player: Player,
    pub search_depth: u8,
    pub use_opening_book: bool,
    pub tt_capacity: usize,
    /// Wall-clock cap on a hard search; `None` searches to full depth.
    #[serde(with = "millis_opt")]
    pub time_budget: Option<Duration>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            player: Player::White,
            search_depth: DEFAULT_SEARCH_DEPTH,
            use_opening_book: true,
            tt_capacity: DEFAULT_TT_CAPACITY,
            time_budget: None,
        }
    }
}

/// Computer opponent. Owns its transposition table, which carries over from
/// move to move; call [`clear_transposition_table`](Self::clear_transposition_table)
/// between unrelated games.
#[derive(Debug, Clone)]
pub struct Bot {
    config: BotConfig,
    tt: TranspositionTable,
    nodes_searched: u64,
    history: Vec<Coordinate>,
}

impl Bot {
    pub fn new(difficulty: Difficulty, player: Player) -> Self {
        Self::with_config(BotConfig {
            difficulty,
            player,
            ..BotConfig::default()
        })
    }

    pub fn with_config(config: BotConfig) -> Self {
        Self {
            config,
            tt: TranspositionTable::new(config.tt_capacity),
            nodes_searched: 0,
            history: Vec::new(),
        }
    }

    /// Picks a move for the side to move on `board`, or `None` when it has none.
    ///
    /// `history` replaces the remembered move list when given; it keys the
    /// opening book. `board` itself is never modified.
    pub fn calculate_move(
        &mut self,
        board: &Board,
        history: Option<&[Coordinate]>,
    ) -> Option<Coordinate> {
        self.nodes_searched = 0;
        let moves = board.valid_moves();
        if moves.is_empty() {
            return None;
        }
        if let Some(history) = history {
            self.history = history.to_vec();
        }

        if self.config.difficulty == Difficulty::Hard
            && self.config.use_opening_book
            && self.history.len() < BOOK_MOVE_LIMIT
            && let Some(book_move) = opening_book::lookup(&self.history)
            && moves.contains(&book_move)
        {
            log::debug!(
                "book move {} after {} plies",
                opening_book::move_to_notation(book_move),
                self.history.len()
            );
            return Some(book_move);
        }

        match self.config.difficulty {
            Difficulty::Easy => moves.choose(&mut rand::rng()).copied(),
            Difficulty::Medium => self.greedy_move(board, &moves),
            Difficulty::Hard => self.search_move(board),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.config.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.config.difficulty = difficulty;
    }

    pub fn player(&self) -> Player {
        self.config.player
    }

    /// Search scores are relative to the side to move, so the cache stays
    /// valid across a colour change.
    pub fn set_player(&mut self, player: Player) {
        self.config.player = player;
    }

    pub fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    pub fn transposition_table_size(&self) -> usize {
        self.tt.len()
    }

    pub fn clear_transposition_table(&mut self) {
        self.tt.clear();
    }

    pub fn set_use_opening_book(&mut self, enabled: bool) {
        self.config.use_opening_book = enabled;
    }

    pub fn is_opening_book_enabled(&self) -> bool {
        self.config.use_opening_book
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Maximises the bot's disc margin one ply ahead; ties keep scan order.
    fn greedy_move(&self, board: &Board, moves: &[Coordinate]) -> Option<Coordinate> {
        let me = self.config.player;
        let mut best: Option<(Coordinate, i32)> = None;
        for &mv in moves {
            let Ok(next) = board.play(mv) else {
                continue;
            };
            let margin = next.count(me) as i32 - next.count(me.opponent()) as i32;
            if best.is_none_or(|(_, best_margin)| margin > best_margin) {
                best = Some((mv, margin));
            }
        }
        best.map(|(mv, _)| mv)
    }

    fn search_move(&mut self, board: &Board) -> Option<Coordinate> {
        let depth = self.config.search_depth;
        let mut searcher = match self.config.time_budget {
            Some(budget) => Searcher::with_timeout(&mut self.tt, depth, budget),
            None => Searcher::new(&mut self.tt, depth),
        };
        let best = searcher.search(board);
        let (nodes, timed_out) = (searcher.nodes(), searcher.timed_out());

        self.nodes_searched = nodes;
        log::debug!(
            "searched {nodes} nodes (timed out: {timed_out}), tt size {}, best {best:?}",
            self.tt.len()
        );
        best
    }
}

impl MoveSelector for Bot {
    fn select_move(&mut self, board: &Board, history: &[Coordinate]) -> Option<Coordinate> {
        self.calculate_move(board, Some(history))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::board::tests::grid;

    fn c(x: u8, y: u8) -> Coordinate {
        Coordinate::new(x, y)
    }

    fn hard_without_book(player: Player) -> Bot {
        Bot::with_config(BotConfig {
            difficulty: Difficulty::Hard,
            player,
            use_opening_book: false,
            ..BotConfig::default()
        })
    }

    #[test]
    fn returns_none_without_legal_moves() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let mut bot = Bot::new(difficulty, Player::Black);
            assert_eq!(bot.calculate_move(&Board::empty(), None), None);
        }
    }

    #[test]
    fn easy_varies_and_stays_legal() {
        let board = Board::new();
        let mut bot = Bot::new(Difficulty::Easy, Player::Black);

        let picks: HashSet<Coordinate> = (0..20)
            .map(|_| bot.calculate_move(&board, None).unwrap())
            .collect();

        assert!(picks.len() >= 2);
        assert!(picks.iter().all(|&mv| board.is_valid_move(mv)));
    }

    #[test]
    fn medium_takes_the_largest_capture() {
        let board = Board::from_grid(&grid([
            "........", "........", "........", "...WB...", "...BW...", "........",
            "........", "BWWW....",
        ]));
        let mut bot = Bot::new(Difficulty::Medium, Player::Black);

        assert_eq!(bot.calculate_move(&board, None), Some(c(4, 7)));
    }

    #[test]
    fn medium_is_deterministic_and_breaks_ties_by_scan_order() {
        let board = Board::new();
        let mut bot = Bot::new(Difficulty::Medium, Player::Black);

        for _ in 0..5 {
            assert_eq!(bot.calculate_move(&board, None), Some(c(3, 2)));
        }
        assert_eq!(board, Board::new());
    }

    #[test]
    fn hard_plays_the_book_move_on_an_empty_history() {
        let mut bot = Bot::new(Difficulty::Hard, Player::Black);

        assert_eq!(bot.calculate_move(&Board::new(), Some(&[])), Some(c(5, 4)));
        assert_eq!(bot.nodes_searched(), 0);
    }

    #[test]
    fn hard_ignores_a_book_move_that_is_illegal_here() {
        let board = Board::new().play(c(3, 2)).unwrap();
        let mut bot = Bot::new(Difficulty::Hard, Player::White);

        let mv = bot.calculate_move(&board, Some(&[])).unwrap();

        assert!(board.is_valid_move(mv));
        assert!(bot.nodes_searched() > 0);
    }

    #[test]
    fn hard_skips_the_book_once_the_game_is_underway() {
        let mut board = Board::new();
        let mut history = Vec::new();
        for _ in 0..BOOK_MOVE_LIMIT {
            let mv = board.valid_moves()[0];
            board.apply_move(mv).unwrap();
            history.push(mv);
        }
        let mut bot = Bot::new(Difficulty::Hard, board.turn());

        let mv = bot.calculate_move(&board, Some(&history)).unwrap();

        assert!(board.is_valid_move(mv));
        assert!(bot.nodes_searched() > 0);
    }

    #[test]
    fn hard_grabs_the_corner() {
        let board = Board::from_grid(&grid([
            ".WB.....", "........", "........", "...WB...", "...BW...", "........",
            "........", "........",
        ]));
        let mut bot = hard_without_book(Player::Black);

        assert_eq!(bot.calculate_move(&board, None), Some(c(0, 0)));
        assert!(bot.transposition_table_size() > 0);
    }

    #[test]
    fn hard_is_deterministic_and_table_can_be_cleared() {
        let board = Board::new().play(c(3, 2)).unwrap();
        let mut bot = hard_without_book(Player::White);

        let first = bot.calculate_move(&board, None);
        let second = bot.calculate_move(&board, None);
        assert_eq!(first, second);

        bot.clear_transposition_table();
        assert_eq!(bot.transposition_table_size(), 0);
        assert_eq!(bot.calculate_move(&board, None), first);
    }

    #[test]
    fn time_budget_still_yields_a_legal_move() {
        let board = Board::new().play(c(3, 2)).unwrap();
        let mut bot = Bot::with_config(BotConfig {
            difficulty: Difficulty::Hard,
            player: Player::White,
            search_depth: 20,
            time_budget: Some(Duration::from_millis(50)),
            use_opening_book: false,
            ..BotConfig::default()
        });

        let mv = bot.calculate_move(&board, None).unwrap();

        assert!(board.is_valid_move(mv));
    }

    #[test]
    fn accessors_update_configuration() {
        let mut bot = Bot::new(Difficulty::Easy, Player::White);
        bot.set_difficulty(Difficulty::Hard);
        bot.set_player(Player::Black);
        bot.set_use_opening_book(false);

        assert_eq!(bot.difficulty(), Difficulty::Hard);
        assert_eq!(bot.player(), Player::Black);
        assert!(!bot.is_opening_book_enabled());
        assert_eq!(bot.config().search_depth, 5);
        assert_eq!(bot.config().tt_capacity, 100_000);
    }

    #[test]
    fn difficulty_parses_and_serialises_lowercase() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("expert".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Easy.to_string(), "easy");
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: BotConfig =
            serde_json::from_str(r#"{"difficulty":"hard","time_budget":250}"#).unwrap();

        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.player, Player::White);
        assert_eq!(config.search_depth, 5);
        assert_eq!(config.time_budget, Some(Duration::from_millis(250)));
    }
}
