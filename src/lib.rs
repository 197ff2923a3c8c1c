pub mod ai;
pub mod game;
pub mod storage;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, DecisionRule, Difficulty};
pub use game::{
    Board, Cell, ConfigError, GameEvent, GameMode, GameState, GameStatus, IntegrityError, Mark,
    MoveAction, MoveRejection, OpponentTicket, RuleEngine, RuleError, RuleResolution, ScoreTally,
    Session, SessionConfig, Theme, WinningLine, WINNING_LINES,
};
pub use storage::{CounterStore, DisabledStore, LocalStorageStore, MemoryStore, StorageError};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}

fn to_js_error<E: Serialize + Display>(error: E) -> JsValue {
    to_value(&error).unwrap_or_else(|_| JsValue::from_str(&error.to_string()))
}

fn serde_to_js_error<E: Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn resolution_json(resolution: &RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(resolution).map_err(serde_to_js_error)
}

fn parse_tag<T>(value: &str) -> Result<T, JsValue>
where
    T: FromStr<Err = ConfigError>,
{
    T::from_str(value).map_err(to_js_error)
}

/// 打开浏览器存储；不可用时退化为仅在本次会话内计分。
fn open_store() -> Box<dyn CounterStore> {
    match LocalStorageStore::open() {
        Ok(store) => Box::new(store),
        Err(error) => {
            console_log!("[engine] {error}; scores will not persist");
            Box::new(DisabledStore)
        }
    }
}

#[wasm_bindgen]
pub struct GameEngine {
    session: Rc<RefCell<Session>>,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => SessionConfig::from_json(&json).map_err(to_js_error)?,
            None => SessionConfig::default(),
        };
        let session = Session::new(config, open_store());
        Ok(GameEngine {
            session: Rc::new(RefCell::new(session)),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().state()).map_err(serde_to_js_error)
    }

    pub fn restore_state_json(&mut self, json: &str) -> Result<String, JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        let resolution = self
            .session
            .borrow_mut()
            .restore_state(state)
            .map_err(to_js_error)?;
        resolution_json(&resolution)
    }

    /// 人类玩家点击格子。
    pub fn play(&mut self, index: usize) -> Result<String, JsValue> {
        let resolution = self.session.borrow_mut().play(index).map_err(to_js_error)?;
        resolution_json(&resolution)
    }

    pub fn apply_move(&mut self, index: usize, mark: &str) -> Result<String, JsValue> {
        let mark: Mark = parse_tag(mark)?;
        let resolution = self
            .session
            .borrow_mut()
            .apply_move(index, mark)
            .map_err(to_js_error)?;
        resolution_json(&resolution)
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let resolution = self.session.borrow_mut().reset();
        resolution_json(&resolution)
    }

    pub fn reset_scores(&mut self) -> Result<String, JsValue> {
        let resolution = self.session.borrow_mut().reset_scores();
        resolution_json(&resolution)
    }

    pub fn board(&self) -> Result<JsValue, JsValue> {
        to_value(self.session.borrow().board()).map_err(JsValue::from)
    }

    pub fn current_turn(&self) -> String {
        self.session.borrow().current_turn().to_string()
    }

    pub fn status(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.borrow().status()).map_err(JsValue::from)
    }

    pub fn scores(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.borrow().scores()).map_err(JsValue::from)
    }

    pub fn difficulty(&self) -> String {
        self.session.borrow().difficulty().as_str().to_string()
    }

    pub fn set_difficulty(&mut self, value: &str) -> Result<(), JsValue> {
        let difficulty: Difficulty = parse_tag(value)?;
        self.session.borrow_mut().set_difficulty(difficulty);
        Ok(())
    }

    pub fn mode(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.borrow().mode()).map_err(JsValue::from)
    }

    pub fn set_mode(&mut self, value: &str) -> Result<(), JsValue> {
        let mode: GameMode = parse_tag(value)?;
        self.session.borrow_mut().set_mode(mode);
        Ok(())
    }

    pub fn theme(&self) -> String {
        self.session.borrow().theme().as_str().to_string()
    }

    pub fn set_theme(&mut self, value: &str) -> Result<(), JsValue> {
        let theme: Theme = parse_tag(value)?;
        self.session.borrow_mut().set_theme(theme);
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> String {
        self.session.borrow_mut().toggle_theme().as_str().to_string()
    }

    pub fn awaiting_opponent(&self) -> bool {
        self.session.borrow().awaiting_opponent()
    }

    /// 延迟后由电脑落子。返回的 Promise 解析为结果 JSON；
    /// 若期间棋局已重开或已不是电脑回合，则解析为 `null`。
    pub fn think_opponent(&self, delay_ms: Option<u32>) -> Promise {
        let session = Rc::clone(&self.session);
        let ticket = session.borrow().schedule_opponent();
        let delay = delay_ms.unwrap_or_else(|| session.borrow().opponent_delay_ms());

        future_to_promise(async move {
            let Some(ticket) = ticket else {
                return Ok(JsValue::NULL);
            };
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let resolved = session
                .borrow_mut()
                .resolve_opponent(ticket)
                .map_err(to_js_error)?;
            match resolved {
                Some(resolution) => Ok(JsValue::from_str(&resolution_json(&resolution)?)),
                None => Ok(JsValue::NULL),
            }
        })
    }
}

/// 无状态地计算电脑的下一手，供前端预览或调试。
#[wasm_bindgen(js_name = "computeOpponentMove")]
pub fn compute_opponent_move(
    board: JsValue,
    mark: &str,
    difficulty: Option<String>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let mark: Mark = parse_tag(mark)?;
    let difficulty = match difficulty.as_deref() {
        Some(value) => parse_tag(value)?,
        None => Difficulty::default(),
    };
    let mut agent = AiAgent::new(AiConfig::from_difficulty(difficulty));
    let decision = agent.decide_move(&board, mark);
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "evaluateBoard")]
pub fn evaluate_board(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_value(&RuleEngine::evaluate_termination(&board)).map_err(JsValue::from)
}
