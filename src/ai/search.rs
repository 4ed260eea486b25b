use std::time::Duration;

use web_time::Instant;

use crate::ai::eval::{evaluate, final_score, move_order_score};
use crate::ai::tt::{Bound, TranspositionTable, TtEntry};
use crate::board::{Board, mask_to_coordinates};
use crate::types::Coordinate;

const MIN_SCORE: i32 = -1_000_000;
const MAX_SCORE: i32 = 1_000_000;
/// Node interval between clock reads.
const TIME_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchResult {
    Complete(Option<Coordinate>, i32),
    TimedOut,
}

impl SearchResult {
    fn negate(self) -> Self {
        match self {
            Self::Complete(mv, score) => Self::Complete(mv, -score),
            Self::TimedOut => Self::TimedOut,
        }
    }
}

/// Negamax alpha-beta searcher over a borrowed transposition table.
///
/// Scores are always from the side to move's point of view. Because
/// [`Board::apply_move`] passes automatically, a child may have the same side
/// to move as its parent; its score is then taken as is.
pub struct Searcher<'a> {
    tt: &'a mut TranspositionTable,
    start_time: Instant,
    timeout: Option<Duration>,
    max_depth: u8,
    nodes: u64,
    timed_out: bool,
}

impl<'a> Searcher<'a> {
    pub fn new(tt: &'a mut TranspositionTable, max_depth: u8) -> Self {
        Self {
            tt,
            start_time: Instant::now(),
            timeout: None,
            max_depth: max_depth.max(1),
            nodes: 0,
            timed_out: false,
        }
    }

    pub fn with_timeout(tt: &'a mut TranspositionTable, max_depth: u8, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(tt, max_depth)
        }
    }

    /// Best move for the side to move, or `None` when it has no legal move.
    ///
    /// Deepens one ply at a time up to `max_depth`; when the time budget runs
    /// out the result of the last completed depth is kept.
    pub fn search(&mut self, board: &Board) -> Option<Coordinate> {
        self.start_time = Instant::now();
        self.timed_out = false;
        self.nodes = 0;

        let moves = board.valid_moves();
        match moves.len() {
            0 => return None,
            1 => return moves.first().copied(),
            _ => {}
        }

        let mut best_move = moves[0];
        for depth in 1..=self.max_depth {
            match self.negamax(board, depth, depth, MIN_SCORE, MAX_SCORE) {
                SearchResult::Complete(Some(mv), _score) => best_move = mv,
                SearchResult::Complete(None, _score) => {}
                SearchResult::TimedOut => break,
            }
        }

        Some(best_move)
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn negamax(
        &mut self,
        board: &Board,
        depth: u8,
        root_depth: u8,
        alpha: i32,
        beta: i32,
    ) -> SearchResult {
        self.nodes += 1;
        // Depth-1 search always completes so there is a move to return.
        if root_depth > 1 && self.nodes % TIME_CHECK_INTERVAL == 0 && self.out_of_time() {
            self.timed_out = true;
        }
        if self.timed_out {
            return SearchResult::TimedOut;
        }

        let mover = board.turn();
        let legal = board.legal_moves_mask(mover);
        if legal == 0 {
            if board.legal_moves_mask(mover.opponent()) == 0 {
                return SearchResult::Complete(None, final_score(board, mover));
            }
            // Only hand-built positions get here; played ones pass inside apply_move.
            return self
                .negamax(
                    &board.with_turn(mover.opponent()),
                    depth,
                    root_depth,
                    -beta,
                    -alpha,
                )
                .negate();
        }
        if depth == 0 {
            return SearchResult::Complete(None, evaluate(board, mover));
        }

        let original_alpha = alpha;
        let (mut alpha, mut beta) = (alpha, beta);
        let mut tt_move = None;
        if let Some(entry) = self.tt.probe(board) {
            tt_move = entry.best_move;
            if entry.depth >= depth {
                match entry.bound {
                    Bound::Exact => return SearchResult::Complete(entry.best_move, entry.score),
                    Bound::Lower => alpha = alpha.max(entry.score),
                    Bound::Upper => beta = beta.min(entry.score),
                }
                if alpha >= beta {
                    return SearchResult::Complete(entry.best_move, entry.score);
                }
            }
        }

        let moves = sorted_moves(board, legal, tt_move);
        let mut best_move = moves[0];
        let mut best_score = MIN_SCORE;

        for mv in moves {
            let mut next = *board;
            if next.apply_move(mv).is_err() {
                continue;
            }
            let result = if next.turn() == mover {
                self.negamax(&next, depth - 1, root_depth, alpha, beta)
            } else {
                self.negamax(&next, depth - 1, root_depth, -beta, -alpha)
                    .negate()
            };

            match result {
                SearchResult::TimedOut => return SearchResult::TimedOut,
                SearchResult::Complete(_, score) => {
                    if score > best_score {
                        best_score = score;
                        best_move = mv;
                    }
                    if score > alpha {
                        alpha = score;
                    }
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        let bound = if best_score <= original_alpha {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.tt.store(
            *board,
            TtEntry {
                depth,
                score: best_score,
                bound,
                best_move: Some(best_move),
            },
        );

        SearchResult::Complete(Some(best_move), best_score)
    }

    fn out_of_time(&self) -> bool {
        self.timeout
            .is_some_and(|timeout| self.start_time.elapsed() >= timeout)
    }
}

/// Legal moves best-first: the cached best move, then by square priority.
/// The sort is stable so equal priorities keep scan order.
fn sorted_moves(board: &Board, legal: u64, tt_move: Option<Coordinate>) -> Vec<Coordinate> {
    let mover = board.turn();
    let mut moves = mask_to_coordinates(legal);
    moves.sort_by_key(|&mv| {
        let cached = tt_move == Some(mv);
        (!cached, -move_order_score(board, mv, mover))
    });
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::grid;
    use crate::types::Player;

    fn c(x: u8, y: u8) -> Coordinate {
        Coordinate::new(x, y)
    }

    /// Plain minimax without pruning or caching, for cross-checking scores.
    fn minimax(board: &Board, depth: u8) -> i32 {
        let mover = board.turn();
        let moves = board.valid_moves();
        if moves.is_empty() {
            if board.legal_moves_mask(mover.opponent()) == 0 {
                return final_score(board, mover);
            }
            return -minimax(&board.with_turn(mover.opponent()), depth);
        }
        if depth == 0 {
            return evaluate(board, mover);
        }
        moves
            .into_iter()
            .map(|mv| {
                let next = board.play(mv).unwrap();
                let score = minimax(&next, depth - 1);
                if next.turn() == mover { score } else { -score }
            })
            .max()
            .unwrap()
    }

    #[test]
    fn search_returns_single_legal_move_immediately() {
        let board = Board::from_grid(&grid([
            ".BWWWWWW", "WWWWWWWW", "WWWWWWWW", "WWWWWWWW", "WWWWWWWW", "WWWWWWWW",
            "WWWWWWWW", "WWWWWWWW",
        ]))
        .with_turn(Player::White);
        let mut tt = TranspositionTable::default();
        let mut searcher = Searcher::new(&mut tt, 5);

        assert_eq!(searcher.search(&board), Some(c(0, 0)));
        assert_eq!(searcher.nodes(), 0);
    }

    #[test]
    fn search_without_moves_returns_none() {
        let mut tt = TranspositionTable::default();
        let mut searcher = Searcher::new(&mut tt, 3);

        assert_eq!(searcher.search(&Board::empty()), None);
    }

    #[test]
    fn search_takes_an_available_corner() {
        let board = Board::from_grid(&grid([
            ".WB.....", "........", "........", "...WB...", "...BW...", "........",
            "........", "........",
        ]));
        let mut tt = TranspositionTable::default();
        let mut searcher = Searcher::new(&mut tt, 3);

        assert_eq!(searcher.search(&board), Some(c(0, 0)));
        assert!(searcher.nodes() > 0);
    }

    #[test]
    fn negamax_agrees_with_plain_minimax() {
        let mut board = Board::new();
        for mv in [c(3, 2), c(2, 2), c(1, 2), c(4, 2)] {
            board.apply_move(mv).unwrap();
        }

        for depth in 1..=3 {
            let mut tt = TranspositionTable::default();
            let mut searcher = Searcher::new(&mut tt, depth);
            let result = searcher.negamax(&board, depth, depth, MIN_SCORE, MAX_SCORE);

            assert_eq!(
                result,
                SearchResult::Complete(result_move(&result), minimax(&board, depth)),
                "depth {depth}"
            );
        }
    }

    fn result_move(result: &SearchResult) -> Option<Coordinate> {
        match result {
            SearchResult::Complete(mv, _) => *mv,
            SearchResult::TimedOut => None,
        }
    }

    #[test]
    fn repeated_search_returns_the_same_move() {
        let board = Board::new().play(c(3, 2)).unwrap();
        let mut tt = TranspositionTable::default();

        let first = Searcher::new(&mut tt, 4).search(&board);
        let second = Searcher::new(&mut tt, 4).search(&board);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(!tt.is_empty());
    }

    #[test]
    fn transposition_table_is_bounded() {
        let board = Board::new();
        let mut tt = TranspositionTable::new(10);

        Searcher::new(&mut tt, 4).search(&board);

        assert_eq!(tt.len(), 10);
    }

    #[test]
    fn cached_best_move_is_ordered_first() {
        let board = Board::new();
        let moves = sorted_moves(&board, board.legal_moves_mask(Player::Black), Some(c(4, 5)));

        assert_eq!(moves[0], c(4, 5));
        assert_eq!(moves.len(), 4);
    }

    #[test]
    fn ordering_puts_corners_first_and_x_squares_last() {
        let board = Board::from_grid(&grid([
            ".WB.....", "........", "........", "...WB...", "...BW...", "........",
            "........", "........",
        ]));
        let moves = sorted_moves(&board, board.legal_moves_mask(Player::Black), None);

        assert_eq!(moves[0], c(0, 0));
    }

    #[test]
    fn exhausted_budget_still_returns_a_legal_move() {
        let board = Board::new().play(c(3, 2)).unwrap();
        let mut tt = TranspositionTable::default();
        let mut searcher = Searcher::with_timeout(&mut tt, 12, Duration::ZERO);

        let mv = searcher.search(&board).unwrap();

        assert!(board.is_valid_move(mv));
        assert!(searcher.timed_out());
    }

    #[test]
    fn finished_game_scores_the_disc_margin() {
        let board = Board::from_grid(&grid([
            "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "WWWWWWWW", "WWWWWWWW",
            "WWWWWWWW", "WWWWWWBB",
        ]));
        let mut tt = TranspositionTable::default();
        let mut searcher = Searcher::new(&mut tt, 3);

        let result = searcher.negamax(&board, 3, 3, MIN_SCORE, MAX_SCORE);

        assert_eq!(result, SearchResult::Complete(None, final_score(&board, Player::Black)));
    }
}
