//! 对局会话：持有当前棋局、累计比分、对手配置与持久化存储。
//!
//! 电脑的回合通过 [`OpponentTicket`] 延迟执行。票据记录了签发时的棋局代数与步数，
//! 兑现前会重新校验，重开或换模式后旧票据自动作废。

use serde::{Deserialize, Serialize};

use super::{
    config::{GameMode, SessionConfig, Theme, THEME_KEY},
    rules::{MoveAction, RuleEngine, RuleError, RuleResolution},
    score::ScoreTally,
    state::{Board, GameEvent, GameState, GameStatus, Mark},
};
use crate::ai::{AiAgent, AiConfig, AiDecision, Difficulty};
use crate::storage::CounterStore;

/// 人机模式下人类执 X 先手，电脑执 O。
pub const HUMAN_MARK: Mark = Mark::X;
pub const COMPUTER_MARK: Mark = Mark::O;

/// 延迟落子的凭据。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpponentTicket {
    generation: u64,
    move_count: usize,
    mark: Mark,
}

impl OpponentTicket {
    pub fn mark(&self) -> Mark {
        self.mark
    }
}

pub struct Session {
    state: GameState,
    tally: ScoreTally,
    mode: GameMode,
    theme: Theme,
    opponent_delay_ms: u32,
    agent: AiAgent,
    store: Box<dyn CounterStore>,
    generation: u64,
}

impl Session {
    pub fn new(config: SessionConfig, store: Box<dyn CounterStore>) -> Self {
        let agent = AiAgent::new(AiConfig::from_difficulty(config.difficulty));
        Self::with_agent(config, store, agent)
    }

    pub fn with_agent(config: SessionConfig, store: Box<dyn CounterStore>, agent: AiAgent) -> Self {
        let tally = ScoreTally::load(store.as_ref());
        let theme: Theme = store
            .load_preference(THEME_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        let mut agent = agent;
        agent.set_difficulty(config.difficulty);

        Self {
            state: GameState::new(),
            tally,
            mode: config.mode,
            theme,
            opponent_delay_ms: config.opponent_delay_ms,
            agent,
            store,
            generation: 0,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        self.state.board()
    }

    pub fn current_turn(&self) -> Mark {
        self.state.current_turn()
    }

    pub fn status(&self) -> GameStatus {
        self.state.status()
    }

    pub fn scores(&self) -> ScoreTally {
        self.tally
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Difficulty {
        self.agent.config().difficulty
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn opponent_delay_ms(&self) -> u32 {
        self.opponent_delay_ms
    }

    pub fn computer_mark(&self) -> Option<Mark> {
        match self.mode {
            GameMode::TwoPlayer => None,
            GameMode::VersusComputer => Some(COMPUTER_MARK),
        }
    }

    fn resolution(&self, events: Vec<GameEvent>) -> RuleResolution {
        RuleResolution::new(self.state.clone(), events, self.tally)
    }

    fn persist_counter(&mut self, key: &str, value: u32) {
        if let Err(error) = self.store.save_counter(key, value) {
            crate::console_log!("[session] {error}; keeping {key}={value} in memory only");
        }
    }

    /// 落子并在进入终局时累计比分，每局只计一次。
    pub fn apply_move(&mut self, index: usize, mark: Mark) -> Result<RuleResolution, RuleError> {
        let was_finished = self.state.is_finished();
        let events = RuleEngine::apply_move(&mut self.state, MoveAction::new(index, mark))?;

        let status = self.state.status();
        if !was_finished && status.is_terminal() {
            if let Some((key, value)) = self.tally.record(status) {
                self.persist_counter(key, value);
            }
            crate::console_log!("[session] game over: {status:?}");
        }

        Ok(self.resolution(events))
    }

    /// 人类玩家落子；双人模式下由当前轮次决定棋子。
    pub fn play(&mut self, index: usize) -> Result<RuleResolution, RuleError> {
        let mark = match self.mode {
            GameMode::TwoPlayer => self.state.current_turn(),
            GameMode::VersusComputer => HUMAN_MARK,
        };
        self.apply_move(index, mark)
    }

    pub fn reset(&mut self) -> RuleResolution {
        self.state.reset();
        self.generation = self.generation.wrapping_add(1);
        self.resolution(vec![GameEvent::GameReset])
    }

    pub fn reset_scores(&mut self) -> RuleResolution {
        self.tally.clear();
        for (key, value) in self.tally.entries() {
            self.persist_counter(key, value);
        }
        self.resolution(vec![GameEvent::ScoresReset])
    }

    /// 导入外部状态（例如页面刷新后恢复），校验不变量后才替换。
    pub fn restore_state(&mut self, state: GameState) -> Result<RuleResolution, RuleError> {
        RuleEngine::ensure_integrity(&state)?;
        self.state = state;
        self.generation = self.generation.wrapping_add(1);
        Ok(self.resolution(Vec::new()))
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.agent.set_difficulty(difficulty);
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        if self.mode != mode {
            self.mode = mode;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(error) = self.store.save_preference(THEME_KEY, theme.as_str()) {
            crate::console_log!("[session] {error}; theme not persisted");
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.theme.toggled();
        self.set_theme(next);
        next
    }

    pub fn awaiting_opponent(&self) -> bool {
        self.computer_mark()
            .is_some_and(|mark| !self.state.is_finished() && self.state.current_turn() == mark)
    }

    /// 轮到电脑时签发票据，否则返回 `None`。
    pub fn schedule_opponent(&self) -> Option<OpponentTicket> {
        if !self.awaiting_opponent() {
            return None;
        }
        Some(OpponentTicket {
            generation: self.generation,
            move_count: self.state.move_count(),
            mark: self.state.current_turn(),
        })
    }

    fn ticket_is_current(&self, ticket: &OpponentTicket) -> bool {
        ticket.generation == self.generation
            && ticket.move_count == self.state.move_count()
            && self.computer_mark() == Some(ticket.mark)
            && !self.state.is_finished()
            && self.state.current_turn() == ticket.mark
    }

    /// 兑现票据：过期票据返回 `Ok(None)` 且不修改任何状态。
    pub fn resolve_opponent(
        &mut self,
        ticket: OpponentTicket,
    ) -> Result<Option<RuleResolution>, RuleError> {
        if !self.ticket_is_current(&ticket) {
            crate::console_log!("[session] discarding stale opponent ticket {ticket:?}");
            return Ok(None);
        }

        let decision = self.decide_for(ticket.mark);
        let Some(index) = decision.index else {
            return Ok(None);
        };
        crate::console_log!(
            "[session] opponent {} plays {index} via {:?} ({})",
            decision.mark,
            decision.rule,
            decision.difficulty.as_str()
        );
        self.apply_move(index, ticket.mark).map(Some)
    }

    pub fn decide_for(&mut self, mark: Mark) -> AiDecision {
        let board = *self.state.board();
        self.agent.decide_move(&board, mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::score::{DRAWS_KEY, X_WINS_KEY};
    use crate::storage::{DisabledStore, MemoryStore, StorageError};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// 可在测试中查看写入内容的共享存储。
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<HashMap<String, String>>>);

    impl CounterStore for SharedStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.0.borrow().get(key).cloned())
        }

        fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn versus_computer(difficulty: Difficulty) -> Session {
        let config = SessionConfig::default()
            .with_mode(GameMode::VersusComputer)
            .with_difficulty(difficulty);
        let agent = AiAgent::with_seed(AiConfig::from_difficulty(difficulty), 11);
        Session::with_agent(config, Box::new(MemoryStore::new()), agent)
    }

    fn two_player() -> Session {
        Session::new(SessionConfig::default(), Box::new(MemoryStore::new()))
    }

    fn play_all(session: &mut Session, moves: &[usize]) {
        for &index in moves {
            session.play(index).expect("scripted move should be legal");
        }
    }

    #[test]
    fn two_player_alternates_marks() {
        let mut session = two_player();
        play_all(&mut session, &[0, 4]);
        assert_eq!(session.board().get(0), Some(Some(Mark::X)));
        assert_eq!(session.board().get(4), Some(Some(Mark::O)));
        assert_eq!(session.current_turn(), Mark::X);
        assert!(session.schedule_opponent().is_none());
    }

    #[test]
    fn tally_counts_each_finished_game_once() {
        let mut session = two_player();
        play_all(&mut session, &[0, 4, 1, 8, 2]);
        assert_eq!(session.scores().x_wins, 1);

        assert!(session.play(5).is_err());
        assert_eq!(session.scores().games_played(), 1);

        session.reset();
        assert_eq!(session.status(), GameStatus::InProgress);
        assert_eq!(session.scores().x_wins, 1);

        play_all(&mut session, &[0, 1, 2, 4, 3, 5, 7, 6, 8]);
        assert_eq!(session.status(), GameStatus::Drawn);
        assert_eq!(session.scores().draws, 1);
        assert_eq!(session.scores().games_played(), 2);
    }

    #[test]
    fn scores_are_persisted_and_reloaded() {
        let store = SharedStore::default();
        let mut session = Session::new(SessionConfig::default(), Box::new(store.clone()));
        play_all(&mut session, &[0, 4, 1, 8, 2]);
        assert_eq!(store.load_counter(X_WINS_KEY), 1);

        let reloaded = Session::new(SessionConfig::default(), Box::new(store.clone()));
        assert_eq!(reloaded.scores().x_wins, 1);

        let mut session = reloaded;
        session.reset_scores();
        assert_eq!(session.scores(), ScoreTally::default());
        assert_eq!(store.load_counter(X_WINS_KEY), 0);
        assert_eq!(store.load_counter(DRAWS_KEY), 0);
    }

    #[test]
    fn unavailable_storage_keeps_session_tally() {
        let mut session = Session::new(SessionConfig::default(), Box::new(DisabledStore));
        play_all(&mut session, &[0, 4, 1, 8, 2]);
        assert_eq!(session.scores().x_wins, 1);
        session.set_theme(Theme::Dark);
        assert_eq!(session.theme(), Theme::Dark);
    }

    #[test]
    fn theme_preference_survives_sessions() {
        let store = SharedStore::default();
        let mut session = Session::new(SessionConfig::default(), Box::new(store.clone()));
        assert_eq!(session.theme(), Theme::Light);
        assert_eq!(session.toggle_theme(), Theme::Dark);

        let reloaded = Session::new(SessionConfig::default(), Box::new(store));
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[test]
    fn human_cannot_move_for_computer() {
        let mut session = versus_computer(Difficulty::Hard);
        session.play(0).expect("human opens");
        assert!(session.awaiting_opponent());
        assert!(session.play(1).is_err());
        assert_eq!(session.state().move_count(), 1);
    }

    #[test]
    fn opponent_ticket_applies_hard_move() {
        let mut session = versus_computer(Difficulty::Hard);
        assert!(session.schedule_opponent().is_none());

        session.play(0).expect("human opens");
        let ticket = session.schedule_opponent().expect("computer to move");
        assert_eq!(ticket.mark(), Mark::O);

        let resolution = session
            .resolve_opponent(ticket)
            .expect("ticket is valid")
            .expect("move applied");
        assert_eq!(resolution.state.board().get(4), Some(Some(Mark::O)));
        assert_eq!(session.current_turn(), Mark::X);
    }

    #[test]
    fn stale_ticket_after_reset_is_discarded() {
        let mut session = versus_computer(Difficulty::Hard);
        session.play(0).expect("human opens");
        let ticket = session.schedule_opponent().expect("computer to move");

        session.reset();
        session.play(8).expect("human opens again");

        let before = session.state().clone();
        assert_eq!(session.resolve_opponent(ticket), Ok(None));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn ticket_is_single_use() {
        let mut session = versus_computer(Difficulty::Easy);
        session.play(4).expect("human opens");
        let ticket = session.schedule_opponent().expect("computer to move");

        assert!(matches!(session.resolve_opponent(ticket), Ok(Some(_))));
        assert_eq!(session.resolve_opponent(ticket), Ok(None));
        assert_eq!(session.state().move_count(), 2);
    }

    #[test]
    fn switching_mode_invalidates_ticket() {
        let mut session = versus_computer(Difficulty::Hard);
        session.play(0).expect("human opens");
        let ticket = session.schedule_opponent().expect("computer to move");

        session.set_mode(GameMode::TwoPlayer);
        assert_eq!(session.resolve_opponent(ticket), Ok(None));
        assert_eq!(session.current_turn(), Mark::O);
    }

    #[test]
    fn difficulty_change_applies_to_next_move() {
        let mut session = versus_computer(Difficulty::Easy);
        session.play(0).expect("human opens");
        session.set_difficulty(Difficulty::Hard);
        assert_eq!(session.difficulty(), Difficulty::Hard);

        let ticket = session.schedule_opponent().expect("computer to move");
        let resolution = session
            .resolve_opponent(ticket)
            .expect("ticket is valid")
            .expect("move applied");
        assert_eq!(resolution.state.board().get(4), Some(Some(Mark::O)));
    }

    #[test]
    fn full_game_against_computer_is_tallied_once() {
        let mut session = versus_computer(Difficulty::Hard);
        let mut human_moves = vec![0, 1, 6, 5, 7, 8].into_iter();
        while !session.state().is_finished() {
            if let Some(ticket) = session.schedule_opponent() {
                session
                    .resolve_opponent(ticket)
                    .expect("ticket is valid");
                continue;
            }
            let next = human_moves
                .by_ref()
                .find(|&index| session.board().is_empty(index))
                .or_else(|| session.board().empty_cells().first().copied())
                .expect("an empty cell remains while in progress");
            session.play(next).expect("human move is legal");
        }
        assert_eq!(session.scores().games_played(), 1);
        assert_ne!(session.status(), GameStatus::InProgress);
    }

    #[test]
    fn restore_rejects_inconsistent_state() {
        let mut session = two_player();
        let json = r#"{"board":["X","X",null,null,null,null,null,null,null],"current_turn":"O","history":[0,1]}"#;
        let state: GameState = serde_json::from_str(json).expect("state should parse");
        assert!(matches!(
            session.restore_state(state),
            Err(RuleError::IntegrityViolation { .. })
        ));
        assert_eq!(session.state().move_count(), 0);
    }

    #[test]
    fn restore_rejects_history_that_was_never_played() {
        let mut session = two_player();
        let json = r#"{"board":["X",null,null,null,null,null,null,null,null],"current_turn":"O","history":[8]}"#;
        let state: GameState = serde_json::from_str(json).expect("state should parse");
        assert!(matches!(
            session.restore_state(state),
            Err(RuleError::IntegrityViolation { .. })
        ));
        assert!(session.state().history().is_empty());
    }

    #[test]
    fn restore_accepts_state_from_a_real_game() {
        let mut played = two_player();
        play_all(&mut played, &[4, 0, 8]);
        let json = serde_json::to_string(played.state()).expect("state serializes");

        let mut session = two_player();
        let state: GameState = serde_json::from_str(&json).expect("state should parse");
        session.restore_state(state).expect("replayable state is accepted");
        assert_eq!(session.state(), played.state());
        assert_eq!(session.current_turn(), Mark::O);
    }
}
