//! 浏览器端测试：`wasm-pack test --headless --firefox`。

#![cfg(target_arch = "wasm32")]

use tictactoe_wasm::{GameEngine, RuleResolution};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn parse(json: &str) -> RuleResolution {
    serde_json::from_str(json).expect("engine returns valid resolution JSON")
}

#[wasm_bindgen_test]
fn human_move_is_reflected_in_state() {
    let mut engine = GameEngine::new(None).expect("engine should start");
    engine.reset().expect("reset succeeds");

    let resolution = parse(&engine.play(4).expect("center is free"));
    assert_eq!(resolution.state.move_count(), 1);
    assert_eq!(engine.current_turn(), "O");
    assert!(engine.play(4).is_err());
}

#[wasm_bindgen_test]
fn unknown_difficulty_is_rejected() {
    let mut engine = GameEngine::new(None).expect("engine should start");
    assert!(engine.set_difficulty("impossible").is_err());
    assert!(engine.set_difficulty("hard").is_ok());
    assert_eq!(engine.difficulty(), "hard");
}

#[wasm_bindgen_test]
async fn opponent_replies_after_delay() {
    let mut engine = GameEngine::new(Some(
        r#"{"mode":"versus_computer","difficulty":"hard","opponent_delay_ms":10}"#.to_string(),
    ))
    .expect("engine should start");
    engine.reset().expect("reset succeeds");
    engine.play(0).expect("human opens");
    assert!(engine.awaiting_opponent());

    let value = JsFuture::from(engine.think_opponent(None))
        .await
        .expect("opponent move resolves");
    let json = value.as_string().expect("resolution is returned as JSON");
    let resolution = parse(&json);
    assert_eq!(resolution.state.board().get(4), Some(Some(tictactoe_wasm::Mark::O)));
}

#[wasm_bindgen_test]
async fn reset_during_delay_discards_opponent_move() {
    let mut engine = GameEngine::new(Some(
        r#"{"mode":"versus_computer","difficulty":"hard","opponent_delay_ms":20}"#.to_string(),
    ))
    .expect("engine should start");
    engine.reset().expect("reset succeeds");
    engine.play(0).expect("human opens");

    let pending = engine.think_opponent(None);
    engine.reset().expect("reset succeeds");

    let value = JsFuture::from(pending).await.expect("promise resolves");
    assert_eq!(value, JsValue::NULL);
    assert_eq!(
        parse(&engine.reset().expect("reset succeeds")).state.move_count(),
        0
    );
}
