//! JavaScript bindings around [`GameEngine`] and [`Bot`].
//!
//! Structured values cross the boundary as plain JS objects through
//! `serde-wasm-bindgen`; saved games cross as JSON strings.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::ai::{Bot, BotConfig, Difficulty};
use crate::error::OthelloError;
use crate::game::{GameEngine, GameOptions};
use crate::opening_book;
use crate::types::{Coordinate, Player};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}

/// Routes `log` output to the browser console. Safe to call more than once.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        _ = console_log::init_with_level(log::Level::Debug);
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).map_err(JsValue::from)
}

fn js_error(err: OthelloError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn is_absent(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}

#[wasm_bindgen]
pub struct WasmGame {
    engine: GameEngine,
    bot: Bot,
}

#[wasm_bindgen]
impl WasmGame {
    /// `options` takes the shape of [`GameOptions`]; pass `undefined` for a
    /// standard untimed game.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmGame, JsValue> {
        let options: GameOptions = if is_absent(&options) {
            GameOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        Ok(Self {
            engine: GameEngine::with_options(options),
            bot: Bot::with_config(BotConfig::default()),
        })
    }

    #[wasm_bindgen(js_name = makeMove)]
    pub fn make_move(&mut self, x: u8, y: u8) -> bool {
        self.engine.make_move(Coordinate::new(x, y))
    }

    /// Lets the bot play for whichever side is to move.
    #[wasm_bindgen(js_name = makeAiMove)]
    pub fn make_ai_move(&mut self) -> bool {
        self.bot.set_player(self.engine.current_player());
        self.engine.make_ai_move(&mut self.bot)
    }

    /// Accepts `"easy"`, `"medium"` or `"hard"`.
    #[wasm_bindgen(js_name = setDifficulty)]
    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<(), JsValue> {
        let difficulty: Difficulty = difficulty
            .parse()
            .map_err(|err: String| JsValue::from_str(&err))?;
        self.bot.set_difficulty(difficulty);
        Ok(())
    }

    #[wasm_bindgen(js_name = botConfig)]
    pub fn bot_config(&self) -> Result<JsValue, JsValue> {
        to_js(self.bot.config())
    }

    #[wasm_bindgen(js_name = nodesSearched)]
    pub fn nodes_searched(&self) -> f64 {
        self.bot.nodes_searched() as f64
    }

    pub fn undo(&mut self) -> bool {
        self.engine.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.engine.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.bot.clear_transposition_table();
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.get_state())
    }

    #[wasm_bindgen(js_name = annotatedBoard)]
    pub fn annotated_board(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.annotated_board())
    }

    #[wasm_bindgen(js_name = evaluatePosition)]
    pub fn evaluate_position(&self) -> i32 {
        self.engine.evaluate_position()
    }

    #[wasm_bindgen(js_name = openingName)]
    pub fn opening_name(&self) -> Option<String> {
        let played: Vec<Coordinate> = self
            .engine
            .move_history()
            .iter()
            .map(|record| record.coordinate)
            .collect();
        opening_book::opening_name(&played).map(str::to_owned)
    }

    #[wasm_bindgen(js_name = exportState)]
    pub fn export_state(&self) -> Result<String, JsValue> {
        self.engine.export_json().map_err(js_error)
    }

    #[wasm_bindgen(js_name = importState)]
    pub fn import_state(&mut self, json: &str) -> Result<(), JsValue> {
        self.engine.import_json(json).map_err(js_error)
    }

    #[wasm_bindgen(js_name = timeRemaining)]
    pub fn time_remaining(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.time_remaining())
    }

    #[wasm_bindgen(js_name = timeControlState)]
    pub fn time_control_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.time_control_state())
    }

    #[wasm_bindgen(js_name = pauseTime)]
    pub fn pause_time(&mut self) {
        self.engine.pause_time();
    }

    #[wasm_bindgen(js_name = resumeTime)]
    pub fn resume_time(&mut self) {
        self.engine.resume_time();
    }

    /// Polls the clock; returns the flagged player (`"B"` or `"W"`), if any.
    #[wasm_bindgen(js_name = checkTimeout)]
    pub fn check_timeout(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.check_timeout())
    }

    /// `current` is `"B"` or `"W"`.
    #[wasm_bindgen(js_name = restoreTimeState)]
    pub fn restore_time_state(
        &mut self,
        black_millis: f64,
        white_millis: f64,
        current: JsValue,
    ) -> Result<(), JsValue> {
        let current: Player = serde_wasm_bindgen::from_value(current)?;
        self.engine
            .restore_time_state(black_millis as i64, white_millis as i64, current);
        Ok(())
    }
}
