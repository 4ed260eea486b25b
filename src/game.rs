use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::ai::eval;
use crate::board::{BOARD_SIZE, Board};
use crate::error::{OthelloError, Result};
use crate::time_control::{PlayerTime, TimeControlConfig, TimeControlManager, TimeControlState};
use crate::types::{AnnotatedTile, Coordinate, GameState, MoveRecord, Player, Score};

/// Save format version written by [`GameEngine::export_state`].
pub const SAVE_VERSION: u32 = 1;
const MAX_MOVES: usize = BOARD_SIZE * BOARD_SIZE - 4;

/// Source of computer moves for [`GameEngine::make_ai_move`].
pub trait MoveSelector {
    /// Move for the side to move on `board`, given the coordinates played so far.
    fn select_move(&mut self, board: &Board, history: &[Coordinate]) -> Option<Coordinate>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameEventKind {
    Move,
    InvalidMove,
    GameOver,
    StateChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// Full board, or neither side can move.
    NoMovesLeft,
    /// The side to move ran out of clock time.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub winner: Option<Player>,
    pub reason: GameOverReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Move {
        record: MoveRecord,
        state: GameState,
    },
    InvalidMove {
        coordinate: Coordinate,
        error: OthelloError,
    },
    GameOver {
        winner: Option<Player>,
        reason: GameOverReason,
        state: GameState,
    },
    StateChange {
        state: GameState,
        action: Option<HistoryAction>,
    },
}

impl GameEvent {
    pub fn kind(&self) -> GameEventKind {
        match self {
            Self::Move { .. } => GameEventKind::Move,
            Self::InvalidMove { .. } => GameEventKind::InvalidMove,
            Self::GameOver { .. } => GameEventKind::GameOver,
            Self::StateChange { .. } => GameEventKind::StateChange,
        }
    }
}

/// Handle returned by [`GameEngine::on`], used to unregister that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&GameEvent)>;

/// Construction options; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub black_player_id: Option<String>,
    pub white_player_id: Option<String>,
    /// Starting position instead of the standard four discs.
    pub initial_board: Option<Board>,
    pub time_control: Option<TimeControlConfig>,
}

/// Serialised game produced by [`GameEngine::export_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: u32,
    pub board: Board,
    pub move_history: Vec<MoveRecord>,
    pub black_player_id: Option<String>,
    pub white_player_id: Option<String>,
    #[serde(default)]
    pub time_control: Option<TimeControlState>,
    #[serde(default)]
    pub timed_out: Option<Player>,
    /// CRC-32 of every other field.
    pub checksum: u32,
}

impl SavedGame {
    fn compute_checksum(&self) -> Result<u32> {
        let body = serde_json::to_vec(&(
            self.version,
            &self.board,
            &self.move_history,
            &self.black_player_id,
            &self.white_player_id,
            &self.time_control,
            &self.timed_out,
        ))?;
        Ok(crc32fast::hash(&body))
    }

    fn validate(&self) -> Result<()> {
        if self.version != SAVE_VERSION {
            return Err(OthelloError::CorruptState(format!(
                "unsupported save version {}",
                self.version
            )));
        }
        let expected = self.compute_checksum()?;
        if self.checksum != expected {
            return Err(OthelloError::CorruptState(format!(
                "checksum mismatch: stored {:#010x}, computed {expected:#010x}",
                self.checksum
            )));
        }
        if self.move_history.len() > MAX_MOVES {
            return Err(OthelloError::CorruptState(format!(
                "{} moves recorded, at most {MAX_MOVES} fit on a board",
                self.move_history.len()
            )));
        }
        for record in &self.move_history {
            let occupied = self
                .board
                .tile_at(record.coordinate)
                .map_err(|err| OthelloError::CorruptState(err.to_string()))?
                .owner()
                .is_some();
            if !occupied {
                return Err(OthelloError::CorruptState(format!(
                    "move at {} is empty on the saved board",
                    record.coordinate
                )));
            }
        }
        Ok(())
    }
}

/// Undo/redo snapshot of everything a move changes.
#[derive(Debug, Clone)]
struct Snapshot {
    board: Board,
    history: Vec<MoveRecord>,
    clock: Option<TimeControlState>,
    timed_out: Option<Player>,
}

/// Stateful Othello game: canonical board, history, undo/redo, optional clock
/// and synchronous event listeners.
pub struct GameEngine {
    board: Board,
    history: Vec<MoveRecord>,
    black_player_id: Option<String>,
    white_player_id: Option<String>,
    clock: Option<TimeControlManager>,
    clock_config: Option<TimeControlConfig>,
    /// Player whose flag fell, once a timeout has been detected.
    timed_out: Option<Player>,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    listeners: HashMap<GameEventKind, Vec<(ListenerId, Listener)>>,
    next_listener: u64,
}

impl GameEngine {
    pub fn new() -> Self {
        Self::with_options(GameOptions::default())
    }

    pub fn with_options(options: GameOptions) -> Self {
        let board = with_movable_turn(options.initial_board.unwrap_or_default());
        let clock = options.time_control.map(|config| {
            let mut clock = TimeControlManager::new(config);
            clock.start_clock(board.turn());
            clock
        });

        Self {
            board,
            history: Vec::new(),
            black_player_id: options.black_player_id,
            white_player_id: options.white_player_id,
            clock,
            clock_config: options.time_control,
            timed_out: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            listeners: HashMap::new(),
            next_listener: 0,
        }
    }

    /// Registers `listener` for events of `kind`. Listeners run synchronously
    /// in registration order.
    pub fn on<F>(&mut self, kind: GameEventKind, listener: F) -> ListenerId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Removes one listener; returns whether it was registered.
    pub fn off(&mut self, kind: GameEventKind, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        list.len() != before
    }

    /// Plays `coord` for the side to move. Returns `false`, with the board
    /// untouched and an `InvalidMove` event emitted, when the move is rejected.
    pub fn make_move(&mut self, coord: Coordinate) -> bool {
        if self.is_game_over() {
            self.emit(GameEvent::InvalidMove {
                coordinate: coord,
                error: OthelloError::GameOver,
            });
            return false;
        }
        let mover = self.board.turn();
        if self.detect_timeout().is_some() {
            self.emit(GameEvent::InvalidMove {
                coordinate: coord,
                error: OthelloError::TimeOut(mover),
            });
            self.emit_game_over();
            return false;
        }

        let mut next = self.board;
        if let Err(error) = next.apply_move(coord) {
            log::debug!("rejected move {coord} for {mover}: {error}");
            self.emit(GameEvent::InvalidMove {
                coordinate: coord,
                error,
            });
            return false;
        }

        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        self.board = next;

        let game_over = self.board.is_game_over();
        if let Some(clock) = &mut self.clock {
            // Moving while paused resumes the mover's clock first.
            clock.resume();
            clock.stop_clock();
            if !game_over {
                clock.start_clock(self.board.turn());
            }
        }

        let record = MoveRecord {
            player: mover,
            coordinate: coord,
            timestamp: now_millis(),
            score_after: self.board.score(),
        };
        self.history.push(record);

        self.emit(GameEvent::Move {
            record,
            state: self.get_state(),
        });
        self.emit(GameEvent::StateChange {
            state: self.get_state(),
            action: None,
        });
        if game_over {
            self.emit_game_over();
        }
        true
    }

    /// Asks `selector` for a move and plays it through [`make_move`](Self::make_move).
    pub fn make_ai_move(&mut self, selector: &mut dyn MoveSelector) -> bool {
        if self.is_game_over() {
            return false;
        }
        let played: Vec<Coordinate> = self.history.iter().map(|r| r.coordinate).collect();
        match selector.select_move(&self.board, &played) {
            Some(coord) => self.make_move(coord),
            None => false,
        }
    }

    /// Records a timeout if the side to move has run out of time, emitting
    /// `GameOver` the first time it is seen. Returns the flagged player.
    pub fn check_timeout(&mut self) -> Option<Player> {
        if self.timed_out.is_some() {
            return self.timed_out;
        }
        let flagged = self.detect_timeout();
        if flagged.is_some() {
            self.emit_game_over();
        }
        flagged
    }

    fn detect_timeout(&mut self) -> Option<Player> {
        let mover = self.board.turn();
        let clock = self.clock.as_mut()?;
        if self.board.is_game_over() || !clock.is_time_out(mover) {
            return None;
        }

        clock.pause();
        self.timed_out = Some(mover);
        log::warn!("{mover} ran out of time");
        self.timed_out
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        if let Some(clock) = &mut self.clock {
            clock.pause();
        }
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(previous);

        self.emit(GameEvent::StateChange {
            state: self.get_state(),
            action: Some(HistoryAction::Undo),
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        if let Some(clock) = &mut self.clock {
            clock.pause();
        }
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(next);

        self.emit(GameEvent::StateChange {
            state: self.get_state(),
            action: Some(HistoryAction::Redo),
        });
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Standard start, empty history and stacks, fresh clock.
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.history.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.timed_out = None;
        self.clock = self.clock_config.map(|config| {
            let mut clock = TimeControlManager::new(config);
            clock.start_clock(Player::Black);
            clock
        });

        self.emit(GameEvent::StateChange {
            state: self.get_state(),
            action: None,
        });
    }

    pub fn get_state(&self) -> GameState {
        let game_over = self.is_game_over();
        GameState {
            board: self.board,
            score: self.board.score(),
            valid_moves: if game_over {
                Vec::new()
            } else {
                self.board.valid_moves()
            },
            is_game_over: game_over,
            winner: self.winner(),
            move_history: self.history.clone(),
            current_player: self.board.turn(),
            black_player_id: self.black_player_id.clone(),
            white_player_id: self.white_player_id.clone(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn annotated_board(&self) -> [[AnnotatedTile; BOARD_SIZE]; BOARD_SIZE] {
        self.board.annotated()
    }

    pub fn move_history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn score(&self) -> Score {
        self.board.score()
    }

    pub fn valid_moves(&self) -> Vec<Coordinate> {
        self.board.valid_moves()
    }

    pub fn current_player(&self) -> Player {
        self.board.turn()
    }

    pub fn is_game_over(&self) -> bool {
        self.timed_out.is_some() || self.board.is_game_over()
    }

    /// Winner once the game is over; `None` while playing or on a draw.
    pub fn winner(&self) -> Option<Player> {
        self.outcome().and_then(|outcome| outcome.winner)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if let Some(loser) = self.timed_out {
            return Some(Outcome {
                winner: Some(loser.opponent()),
                reason: GameOverReason::Timeout,
            });
        }
        self.board.is_game_over().then(|| Outcome {
            winner: self.board.winner(),
            reason: GameOverReason::NoMovesLeft,
        })
    }

    pub fn player_id(&self, color: Player) -> Option<&str> {
        match color {
            Player::Black => self.black_player_id.as_deref(),
            Player::White => self.white_player_id.as_deref(),
        }
    }

    /// Evaluation bar value in `[-64, 64]`, positive when Black stands better.
    pub fn evaluate_position(&self) -> i32 {
        eval::advantage(&self.board)
    }

    pub fn export_state(&self) -> Result<SavedGame> {
        let mut saved = SavedGame {
            version: SAVE_VERSION,
            board: self.board,
            move_history: self.history.clone(),
            black_player_id: self.black_player_id.clone(),
            white_player_id: self.white_player_id.clone(),
            time_control: self.time_control_state(),
            timed_out: self.timed_out,
            checksum: 0,
        };
        saved.checksum = saved.compute_checksum()?;
        Ok(saved)
    }

    /// Loads a saved game after validating it. Undo and redo history is
    /// discarded. On error the engine is left as it was.
    pub fn import_state(&mut self, saved: SavedGame) -> Result<()> {
        if let Err(err) = saved.validate() {
            log::warn!("rejected saved game: {err}");
            return Err(err);
        }

        self.board = with_movable_turn(saved.board);
        self.history = saved.move_history;
        self.black_player_id = saved.black_player_id;
        self.white_player_id = saved.white_player_id;
        self.timed_out = saved.timed_out;
        self.clock_config = saved.time_control.map(|state| state.config);
        self.clock = saved.time_control.map(|state| {
            let mut clock = TimeControlManager::new(state.config);
            clock.import_state(state);
            clock
        });
        self.undo_stack.clear();
        self.redo_stack.clear();

        self.emit(GameEvent::StateChange {
            state: self.get_state(),
            action: None,
        });
        Ok(())
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_state()?)?)
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let saved: SavedGame = serde_json::from_str(json).map_err(|err| {
            log::warn!("rejected saved game: {err}");
            OthelloError::CorruptState(err.to_string())
        })?;
        self.import_state(saved)
    }

    pub fn has_time_control(&self) -> bool {
        self.clock.is_some()
    }

    pub fn time_remaining(&self) -> Option<PlayerTime> {
        self.clock.as_ref().map(TimeControlManager::time_remaining)
    }

    pub fn time_control_state(&self) -> Option<TimeControlState> {
        self.clock.as_ref().map(TimeControlManager::export_state)
    }

    pub fn pause_time(&mut self) {
        if let Some(clock) = &mut self.clock {
            clock.pause();
        }
    }

    pub fn resume_time(&mut self) {
        self.resume_clock_if_live();
    }

    /// Reinstates clocks tracked outside the engine, e.g. after a page reload,
    /// and runs `current`'s clock.
    pub fn restore_time_state(&mut self, black_millis: i64, white_millis: i64, current: Player) {
        let Some(clock) = &mut self.clock else {
            return;
        };
        clock.resume();
        clock.stop_clock();
        clock.start_clock(current);
        clock.set_time_remaining(Player::Black, black_millis);
        clock.set_time_remaining(Player::White, white_millis);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board,
            history: self.history.clone(),
            clock: self.time_control_state(),
            timed_out: self.timed_out,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.board = snapshot.board;
        self.history = snapshot.history;
        self.timed_out = snapshot.timed_out;
        if let (Some(clock), Some(state)) = (&mut self.clock, snapshot.clock) {
            clock.import_state(state);
        }
        self.resume_clock_if_live();
    }

    fn resume_clock_if_live(&mut self) {
        let live = !self.is_game_over();
        if let Some(clock) = &mut self.clock
            && live
        {
            clock.resume();
        }
    }

    fn emit_game_over(&mut self) {
        let Some(outcome) = self.outcome() else {
            return;
        };
        let score = self.board.score();
        log::info!(
            "game over ({:?}): winner {:?}, {}-{}",
            outcome.reason,
            outcome.winner,
            score.black,
            score.white
        );
        self.emit(GameEvent::GameOver {
            winner: outcome.winner,
            reason: outcome.reason,
            state: self.get_state(),
        });
    }

    fn emit(&mut self, event: GameEvent) {
        if let Some(list) = self.listeners.get_mut(&event.kind()) {
            for (_, listener) in list.iter_mut() {
                listener(&event);
            }
        }
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("board", &self.board)
            .field("history", &self.history.len())
            .field("clock", &self.clock)
            .field("timed_out", &self.timed_out)
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .finish_non_exhaustive()
    }
}

/// Hands the turn over when a hand-built position leaves the side to move
/// stuck while the opponent can still play.
fn with_movable_turn(board: Board) -> Board {
    if board.legal_moves_mask(board.turn()) == 0 && !board.is_game_over() {
        board.with_turn(board.turn().opponent())
    } else {
        board
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
