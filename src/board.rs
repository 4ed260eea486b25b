use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OthelloError, Result};
use crate::types::{AnnotatedTile, Coordinate, Player, Score, Tile};

pub const BOARD_SIZE: usize = 8;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];
// Column masks used to stop horizontal shifts wrapping onto the next row.
const NOT_A_FILE: u64 = 0xfefe_fefe_fefe_fefe;
const NOT_H_FILE: u64 = 0x7f7f_7f7f_7f7f_7f7f;

/// Row-major grid, indexed `grid[y][x]`.
pub type Grid = [[Tile; BOARD_SIZE]; BOARD_SIZE];

/// Othello position: two bitboards plus the side to move.
///
/// Bit `y * 8 + x` is set in `black`/`white` when that colour occupies `(x, y)`.
/// The grid is only changed through [`Board::apply_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "BoardRecord", try_from = "BoardRecord")]
pub struct Board {
    black: u64,
    white: u64,
    turn: Player,
}

impl Board {
    /// Creates the initial board:
    /// (3,3)=white, (4,3)=black, (3,4)=black, (4,4)=white. Black moves first.
    pub fn new() -> Self {
        Self {
            black: bit(28) | bit(35),
            white: bit(27) | bit(36),
            turn: Player::Black,
        }
    }

    /// A board without any discs.
    pub fn empty() -> Self {
        Self {
            black: 0,
            white: 0,
            turn: Player::Black,
        }
    }

    /// Builds a board from an explicit grid with Black to move.
    pub fn from_grid(grid: &Grid) -> Self {
        let mut board = Self::empty();
        for (y, row) in grid.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                let square = bit(y * BOARD_SIZE + x);
                match tile {
                    Tile::Black => board.black |= square,
                    Tile::White => board.white |= square,
                    Tile::Empty => {}
                }
            }
        }
        board
    }

    pub fn with_turn(mut self, turn: Player) -> Self {
        self.turn = turn;
        self
    }

    pub fn turn(&self) -> Player {
        self.turn
    }

    pub fn tile_at(&self, coord: Coordinate) -> Result<Tile> {
        if !coord.in_bounds() {
            return Err(OthelloError::OutOfBounds {
                x: coord.x,
                y: coord.y,
            });
        }
        Ok(self.tile_at_index(coord.index()))
    }

    pub fn to_grid(&self) -> Grid {
        let mut grid = [[Tile::Empty; BOARD_SIZE]; BOARD_SIZE];
        for (y, row) in grid.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = self.tile_at_index(y * BOARD_SIZE + x);
            }
        }
        grid
    }

    pub fn score(&self) -> Score {
        Score {
            black: self.black.count_ones() as u8,
            white: self.white.count_ones() as u8,
        }
    }

    pub fn count(&self, player: Player) -> u8 {
        self.discs(player).count_ones() as u8
    }

    /// Returns the number of empty squares.
    pub fn empty_count(&self) -> u8 {
        NUM_SQUARES as u8 - self.score().total()
    }

    pub fn is_full(&self) -> bool {
        (self.black | self.white) == u64::MAX
    }

    /// Bitboard of the discs owned by `player`.
    pub fn discs(&self, player: Player) -> u64 {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    /// True when any of the eight neighbours of `coord` holds a disc.
    pub fn has_adjacent_piece(&self, coord: Coordinate) -> bool {
        if !coord.in_bounds() {
            return false;
        }
        let (row, col) = pos_to_row_col(coord.index());
        let occupied = self.black | self.white;
        DIRECTIONS.iter().any(|&(dr, dc)| {
            let (r, c) = (row + dr, col + dc);
            in_bounds(r, c) && (occupied & bit((r as usize) * BOARD_SIZE + c as usize)) != 0
        })
    }

    /// Returns the legal move mask for `player`, regardless of whose turn it is.
    pub fn legal_moves_mask(&self, player: Player) -> u64 {
        let me = self.discs(player);
        let opp = self.discs(player.opponent());
        let empty = !(me | opp);

        let mut legal = 0u64;
        for shift in SHIFTS {
            let mut run = shift(me) & opp;
            for _ in 0..5 {
                run |= shift(run) & opp;
            }
            legal |= shift(run) & empty;
        }
        legal
    }

    pub fn is_valid_move(&self, coord: Coordinate) -> bool {
        coord.in_bounds() && (self.legal_moves_mask(self.turn) & bit(coord.index())) != 0
    }

    /// All legal moves for the side to move, in row-major scan order.
    pub fn valid_moves(&self) -> Vec<Coordinate> {
        mask_to_coordinates(self.legal_moves_mask(self.turn))
    }

    /// Places a disc for the side to move, flips every captured run and hands
    /// the turn over. When the opponent then has no move but the game goes on,
    /// the turn silently returns to the mover.
    ///
    /// Returns the flipped bit mask. On error the board is left untouched.
    pub fn apply_move(&mut self, coord: Coordinate) -> Result<u64> {
        if !coord.in_bounds() {
            return Err(OthelloError::OutOfBounds {
                x: coord.x,
                y: coord.y,
            });
        }
        let pos = coord.index();
        let move_bit = bit(pos);
        if ((self.black | self.white) & move_bit) != 0 {
            return Err(OthelloError::Occupied(coord));
        }

        let mover = self.turn;
        let me = self.discs(mover);
        let opp = self.discs(mover.opponent());
        let flips = Self::collect_flips(pos, me, opp);
        if flips == 0 {
            return Err(OthelloError::NoFlips(coord));
        }

        let next_me = me | move_bit | flips;
        let next_opp = opp & !flips;
        match mover {
            Player::Black => {
                self.black = next_me;
                self.white = next_opp;
            }
            Player::White => {
                self.white = next_me;
                self.black = next_opp;
            }
        }

        self.turn = mover.opponent();
        if self.legal_moves_mask(self.turn) == 0 && !self.is_game_over() {
            self.turn = mover;
        }

        Ok(flips)
    }

    /// Clone-then-apply: returns the position after `coord`, leaving `self` as is.
    pub fn play(&self, coord: Coordinate) -> Result<Board> {
        let mut next = *self;
        next.apply_move(coord)?;
        Ok(next)
    }

    /// The board is full, or neither side has a legal move.
    pub fn is_game_over(&self) -> bool {
        self.is_full()
            || (self.legal_moves_mask(Player::Black) == 0
                && self.legal_moves_mask(Player::White) == 0)
    }

    /// Player with more discs, `None` on a tie. Only meaningful once the game is over.
    pub fn winner(&self) -> Option<Player> {
        let score = self.score();
        match score.black.cmp(&score.white) {
            std::cmp::Ordering::Greater => Some(Player::Black),
            std::cmp::Ordering::Less => Some(Player::White),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Grid copy with the side to move's legal squares marked as possible.
    pub fn annotated(&self) -> [[AnnotatedTile; BOARD_SIZE]; BOARD_SIZE] {
        let legal = self.legal_moves_mask(self.turn);
        let mut grid = [[AnnotatedTile::Empty; BOARD_SIZE]; BOARD_SIZE];
        for (y, row) in grid.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                let pos = y * BOARD_SIZE + x;
                *cell = if (legal & bit(pos)) != 0 {
                    AnnotatedTile::Possible
                } else {
                    self.tile_at_index(pos).into()
                };
            }
        }
        grid
    }

    fn tile_at_index(&self, pos: usize) -> Tile {
        let square = bit(pos);
        if (self.black & square) != 0 {
            Tile::Black
        } else if (self.white & square) != 0 {
            Tile::White
        } else {
            Tile::Empty
        }
    }

    fn collect_flips(pos: usize, me: u64, opp: u64) -> u64 {
        if pos >= NUM_SQUARES {
            return 0;
        }

        let move_bit = bit(pos);
        if ((me | opp) & move_bit) != 0 {
            return 0;
        }

        let (row, col) = pos_to_row_col(pos);
        let mut flips = 0u64;

        for (dr, dc) in DIRECTIONS {
            let mut r = row + dr;
            let mut c = col + dc;
            let mut line = 0u64;
            let mut has_opponent = false;

            while in_bounds(r, c) {
                let square = bit((r as usize) * BOARD_SIZE + c as usize);
                if (opp & square) != 0 {
                    has_opponent = true;
                    line |= square;
                } else if (me & square) != 0 {
                    if has_opponent {
                        flips |= line;
                    }
                    break;
                } else {
                    break;
                }

                r += dr;
                c += dc;
            }
        }

        flips
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let symbol = match self.tile_at_index(y * BOARD_SIZE + x) {
                    Tile::Black => 'B',
                    Tile::White => 'W',
                    Tile::Empty => '.',
                };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        write!(f, "{} to move", self.turn)
    }
}

/// Serialized form of a [`Board`]: explicit tile rows plus the side to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRecord {
    pub tiles: Vec<Vec<Tile>>,
    pub turn: Player,
}

impl From<Board> for BoardRecord {
    fn from(board: Board) -> Self {
        Self {
            tiles: board.to_grid().iter().map(|row| row.to_vec()).collect(),
            turn: board.turn,
        }
    }
}

impl TryFrom<BoardRecord> for Board {
    type Error = OthelloError;

    fn try_from(record: BoardRecord) -> Result<Self> {
        if record.tiles.len() != BOARD_SIZE {
            return Err(OthelloError::CorruptState(format!(
                "expected {BOARD_SIZE} rows, got {}",
                record.tiles.len()
            )));
        }
        let mut grid = [[Tile::Empty; BOARD_SIZE]; BOARD_SIZE];
        for (y, row) in record.tiles.iter().enumerate() {
            if row.len() != BOARD_SIZE {
                return Err(OthelloError::CorruptState(format!(
                    "row {y} has {} cells, expected {BOARD_SIZE}",
                    row.len()
                )));
            }
            grid[y].copy_from_slice(row);
        }
        Ok(Board::from_grid(&grid).with_turn(record.turn))
    }
}

pub(crate) fn mask_to_coordinates(mut mask: u64) -> Vec<Coordinate> {
    let mut out = Vec::with_capacity(mask.count_ones() as usize);
    while mask != 0 {
        out.push(Coordinate::from_index(mask.trailing_zeros() as usize));
        mask &= mask - 1;
    }
    out
}

pub(crate) fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

const SHIFTS: [fn(u64) -> u64; 8] = [
    |b: u64| (b << 1) & NOT_A_FILE,
    |b: u64| (b >> 1) & NOT_H_FILE,
    |b: u64| b << 8,
    |b: u64| b >> 8,
    |b: u64| (b << 9) & NOT_A_FILE,
    |b: u64| (b << 7) & NOT_H_FILE,
    |b: u64| (b >> 7) & NOT_A_FILE,
    |b: u64| (b >> 9) & NOT_H_FILE,
];

fn pos_to_row_col(pos: usize) -> (i32, i32) {
    ((pos / BOARD_SIZE) as i32, (pos % BOARD_SIZE) as i32)
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}
