#![cfg(target_arch = "wasm32")]

use othello_engine::wasm::{WasmGame, wasm_ready};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn module_reports_ready() {
    assert!(wasm_ready());
}

#[wasm_bindgen_test]
fn plays_and_undoes_through_bindings() {
    let mut game = WasmGame::new(JsValue::UNDEFINED).unwrap();

    assert!(game.make_move(3, 2));
    assert!(!game.make_move(0, 0));
    assert!(game.can_undo());
    assert!(game.undo());
    assert!(game.can_redo());
}

#[wasm_bindgen_test]
fn state_crosses_as_plain_object() {
    let game = WasmGame::new(JsValue::NULL).unwrap();
    let state = game.state().unwrap();

    let player = js_sys::Reflect::get(&state, &JsValue::from_str("current_player")).unwrap();
    assert_eq!(player.as_string().as_deref(), Some("B"));
    let moves = js_sys::Reflect::get(&state, &JsValue::from_str("valid_moves")).unwrap();
    assert_eq!(js_sys::Array::from(&moves).length(), 4);
}

#[wasm_bindgen_test]
fn hard_bot_answers_from_the_book() {
    let mut game = WasmGame::new(JsValue::UNDEFINED).unwrap();
    game.set_difficulty("hard").unwrap();

    assert!(game.make_ai_move());
    assert_eq!(game.nodes_searched(), 0.0);
    assert!(game.set_difficulty("impossible").is_err());
}

#[wasm_bindgen_test]
fn export_import_round_trip() {
    let mut game = WasmGame::new(JsValue::UNDEFINED).unwrap();
    game.make_move(3, 2);
    let saved = game.export_state().unwrap();

    let mut other = WasmGame::new(JsValue::UNDEFINED).unwrap();
    other.import_state(&saved).unwrap();

    assert_eq!(other.export_state().unwrap(), saved);
    assert!(other.import_state("{}").is_err());
}
