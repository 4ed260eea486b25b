//! Static evaluation and move-ordering heuristics.

use crate::board::{BOARD_SIZE, Board, bit};
use crate::types::{Coordinate, Player};

/// Positional weights used by the search, indexed `[y][x]`.
pub const POSITION_WEIGHTS: [[i32; BOARD_SIZE]; BOARD_SIZE] = [
    [100, -20, 10, 5, 5, 10, -20, 100],
    [-20, -50, -2, -2, -2, -2, -50, -20],
    [10, -2, -1, -1, -1, -1, -2, 10],
    [5, -2, -1, -1, -1, -1, -2, 5],
    [5, -2, -1, -1, -1, -1, -2, 5],
    [10, -2, -1, -1, -1, -1, -2, 10],
    [-20, -50, -2, -2, -2, -2, -50, -20],
    [100, -20, 10, 5, 5, 10, -20, 100],
];

/// Gentler table behind the evaluation bar.
const DISPLAY_WEIGHTS: [[i32; BOARD_SIZE]; BOARD_SIZE] = [
    [100, -10, 10, 5, 5, 10, -10, 100],
    [-10, -50, -1, -1, -1, -1, -50, -10],
    [10, -1, 5, 1, 1, 5, -1, 10],
    [5, -1, 1, 0, 0, 1, -1, 5],
    [5, -1, 1, 0, 0, 1, -1, 5],
    [10, -1, 5, 1, 1, 5, -1, 10],
    [-10, -50, -1, -1, -1, -1, -50, -10],
    [100, -10, 10, 5, 5, 10, -10, 100],
];

const MOBILITY_WEIGHT: i32 = 5;
const DISC_WEIGHT: i32 = 1;
const ENDGAME_DISC_WEIGHT: i32 = 20;
/// Disc total above which raw disc count takes over.
const ENDGAME_DISCS: u8 = 50;
/// Multiplier that puts a decided game above any heuristic score.
pub const WIN_SCALE: i32 = 1000;

const EVAL_BAR_LIMIT: f64 = 64.0;

/// Strategic class of a square, as used for move ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareKind {
    Corner,
    /// Diagonally adjacent to the given corner.
    X(Coordinate),
    /// Orthogonally adjacent to the given corner, on the edge.
    C(Coordinate),
    Edge,
    Interior,
}

pub fn classify(coord: Coordinate) -> SquareKind {
    let last = BOARD_SIZE as u8 - 1;
    let on_edge = |v: u8| v == 0 || v == last;
    let near = |v: u8| if v <= 1 { 0 } else { last };
    let corner = Coordinate::new(near(coord.x), near(coord.y));

    match (coord.x, coord.y) {
        (x, y) if on_edge(x) && on_edge(y) => SquareKind::Corner,
        (1 | 6, 1 | 6) => SquareKind::X(corner),
        (x, 1 | 6) if on_edge(x) => SquareKind::C(corner),
        (1 | 6, y) if on_edge(y) => SquareKind::C(corner),
        (x, y) if on_edge(x) || on_edge(y) => SquareKind::Edge,
        _ => SquareKind::Interior,
    }
}

/// Priority of `coord` for `mover`; higher is searched first. X- and C-squares
/// next to a corner the mover already holds are no longer dangerous.
pub fn move_order_score(board: &Board, coord: Coordinate, mover: Player) -> i32 {
    let owns = |corner: Coordinate| board.discs(mover) & bit(corner.index()) != 0;
    match classify(coord) {
        SquareKind::Corner => 1000,
        SquareKind::X(corner) if owns(corner) => 100,
        SquareKind::X(_) => -100,
        SquareKind::C(corner) if owns(corner) => 50,
        SquareKind::C(_) => -50,
        SquareKind::Edge => 30,
        SquareKind::Interior => weight_at(&POSITION_WEIGHTS, coord.index()),
    }
}

/// Heuristic score of `board` from `perspective`'s point of view.
/// `evaluate(b, p) == -evaluate(b, p.opponent())`.
pub fn evaluate(board: &Board, perspective: Player) -> i32 {
    let opponent = perspective.opponent();
    let me = board.discs(perspective);
    let opp = board.discs(opponent);

    let positional = weighted_sum(&POSITION_WEIGHTS, me) - weighted_sum(&POSITION_WEIGHTS, opp);
    let mobility = board.legal_moves_mask(perspective).count_ones() as i32
        - board.legal_moves_mask(opponent).count_ones() as i32;
    let discs = me.count_ones() as i32 - opp.count_ones() as i32;
    let disc_weight = if board.score().total() > ENDGAME_DISCS {
        ENDGAME_DISC_WEIGHT
    } else {
        DISC_WEIGHT
    };

    positional + mobility * MOBILITY_WEIGHT + discs * disc_weight
}

/// Score of a finished game: the disc margin, scaled so any win outranks
/// any heuristic evaluation.
pub fn final_score(board: &Board, perspective: Player) -> i32 {
    let margin =
        board.count(perspective) as i32 - board.count(perspective.opponent()) as i32;
    margin * WIN_SCALE
}

/// Evaluation bar value in `[-64, 64]`, positive when Black stands better.
pub fn advantage(board: &Board) -> i32 {
    let score = board.score();
    let discs = score.black as i32 - score.white as i32;
    if score.total() > ENDGAME_DISCS {
        return (discs * 2).clamp(-64, 64);
    }

    let positional = weighted_sum(&DISPLAY_WEIGHTS, board.discs(Player::Black))
        - weighted_sum(&DISPLAY_WEIGHTS, board.discs(Player::White));
    let mobility = board.legal_moves_mask(Player::Black).count_ones() as i32
        - board.legal_moves_mask(Player::White).count_ones() as i32;

    let raw = positional as f64 / 10.0 + (mobility * 3) as f64 + discs as f64 * 0.5;
    raw.round().clamp(-EVAL_BAR_LIMIT, EVAL_BAR_LIMIT) as i32
}

fn weighted_sum(table: &[[i32; BOARD_SIZE]; BOARD_SIZE], mut mask: u64) -> i32 {
    let mut sum = 0;
    while mask != 0 {
        sum += weight_at(table, mask.trailing_zeros() as usize);
        mask &= mask - 1;
    }
    sum
}

fn weight_at(table: &[[i32; BOARD_SIZE]; BOARD_SIZE], pos: usize) -> i32 {
    table[pos / BOARD_SIZE][pos % BOARD_SIZE]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::grid;

    fn c(x: u8, y: u8) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn classify_recognises_square_kinds() {
        assert_eq!(classify(c(0, 0)), SquareKind::Corner);
        assert_eq!(classify(c(7, 7)), SquareKind::Corner);
        assert_eq!(classify(c(1, 1)), SquareKind::X(c(0, 0)));
        assert_eq!(classify(c(6, 1)), SquareKind::X(c(7, 0)));
        assert_eq!(classify(c(1, 0)), SquareKind::C(c(0, 0)));
        assert_eq!(classify(c(0, 6)), SquareKind::C(c(0, 7)));
        assert_eq!(classify(c(7, 6)), SquareKind::C(c(7, 7)));
        assert_eq!(classify(c(3, 0)), SquareKind::Edge);
        assert_eq!(classify(c(7, 2)), SquareKind::Edge);
        assert_eq!(classify(c(3, 4)), SquareKind::Interior);
        assert_eq!(classify(c(1, 3)), SquareKind::Interior);
    }

    #[test]
    fn weights_are_symmetric() {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let w = POSITION_WEIGHTS[y][x];
                assert_eq!(w, POSITION_WEIGHTS[x][y]);
                assert_eq!(w, POSITION_WEIGHTS[7 - y][x]);
                assert_eq!(w, POSITION_WEIGHTS[y][7 - x]);
            }
        }
    }

    #[test]
    fn move_order_prefers_corner_then_edge_and_avoids_x_square() {
        let board = Board::new();
        let corner = move_order_score(&board, c(0, 0), Player::Black);
        let edge = move_order_score(&board, c(3, 0), Player::Black);
        let interior = move_order_score(&board, c(2, 2), Player::Black);
        let c_square = move_order_score(&board, c(1, 0), Player::Black);
        let x_square = move_order_score(&board, c(1, 1), Player::Black);

        assert!(corner > edge);
        assert!(edge > interior);
        assert!(interior > c_square);
        assert!(c_square > x_square);
    }

    #[test]
    fn owned_corner_neutralises_adjacent_danger() {
        let board = Board::from_grid(&grid([
            "B.......", "........", "........", "...WB...", "...BW...", "........",
            "........", "........",
        ]));

        assert_eq!(move_order_score(&board, c(1, 1), Player::Black), 100);
        assert_eq!(move_order_score(&board, c(0, 1), Player::Black), 50);
        assert_eq!(move_order_score(&board, c(1, 1), Player::White), -100);
        assert_eq!(move_order_score(&board, c(6, 6), Player::Black), -100);
    }

    #[test]
    fn evaluate_is_antisymmetric_and_zero_at_start() {
        assert_eq!(evaluate(&Board::new(), Player::Black), 0);

        let board = Board::new().play(c(3, 2)).unwrap();
        assert_eq!(
            evaluate(&board, Player::Black),
            -evaluate(&board, Player::White)
        );
    }

    #[test]
    fn corner_outweighs_mobility_and_discs() {
        let corner = Board::from_grid(&grid([
            "B.......", "........", "........", "...WB...", "...BW...", "........",
            "........", "........",
        ]));
        let extra_discs = Board::from_grid(&grid([
            "........", "........", "...B....", "...BB...", "...BW...", "........",
            "........", "........",
        ]));

        assert!(evaluate(&corner, Player::Black) > evaluate(&extra_discs, Player::Black));
    }

    #[test]
    fn final_score_scales_disc_margin() {
        let board = Board::from_grid(&grid([
            "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "WWWWWWWW", "WWWWWWWW",
            "WWWWWWWW", "WWWWWWBB",
        ]));

        assert_eq!(final_score(&board, Player::Black), 4 * WIN_SCALE);
        assert_eq!(final_score(&board, Player::White), -4 * WIN_SCALE);
    }

    #[test]
    fn advantage_is_bounded_and_favours_the_stronger_side() {
        assert_eq!(advantage(&Board::new()), 0);

        let black_corners = Board::from_grid(&grid([
            "B......B", "........", "........", "...BB...", "...BW...", "........",
            "........", "B......B",
        ]));
        let value = advantage(&black_corners);
        assert!(value > 0 && value <= 64);

        let all_white = Board::from_grid(&grid([
            "WWWWWWWW", "WWWWWWWW", "WWWWWWWW", "WWWWWWWW", "WWWWWWWW", "WWWWWWWW",
            "WWWWWWWW", "WWWWWWWW",
        ]));
        assert_eq!(advantage(&all_white), -64);
    }
}
