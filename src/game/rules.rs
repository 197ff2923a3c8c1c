use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    score::ScoreTally,
    state::{
        Board, GameEvent, GameState, GameStatus, IntegrityError, Mark, BOARD_CELLS, WINNING_LINES,
    },
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveAction {
    pub index: usize,
    pub mark: Mark,
}

impl MoveAction {
    pub fn new(index: usize, mark: Mark) -> Self {
        Self { index, mark }
    }
}

/// 落子被拒绝的具体原因。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum MoveRejection {
    OutOfRange { index: usize },
    GameFinished,
    NotPlayerTurn { expected: Mark, actual: Mark },
    CellOccupied { index: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    InvalidMove { reason: MoveRejection },
    IntegrityViolation { error: IntegrityError },
}

impl RuleError {
    fn invalid(reason: MoveRejection) -> Self {
        RuleError::InvalidMove { reason }
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InvalidMove { reason } => match reason {
                MoveRejection::OutOfRange { index } => {
                    write!(f, "invalid move: cell {index} is outside 0-8")
                }
                MoveRejection::GameFinished => f.write_str("invalid move: game already finished"),
                MoveRejection::NotPlayerTurn { expected, actual } => {
                    write!(f, "invalid move: it is {expected}'s turn, not {actual}'s")
                }
                MoveRejection::CellOccupied { index } => {
                    write!(f, "invalid move: cell {index} is already occupied")
                }
            },
            RuleError::IntegrityViolation { error } => {
                write!(f, "state integrity violated: {error:?}")
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// 一次操作后的完整结果，直接序列化给前端。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    pub scores: ScoreTally,
}

impl RuleResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>, scores: ScoreTally) -> Self {
        Self {
            state,
            events,
            scores,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.state.status()
    }
}

pub struct RuleEngine;

impl RuleEngine {
    fn ensure_in_range(index: usize) -> Result<(), RuleError> {
        if index >= BOARD_CELLS {
            return Err(RuleError::invalid(MoveRejection::OutOfRange { index }));
        }
        Ok(())
    }

    fn ensure_in_progress(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::invalid(MoveRejection::GameFinished));
        }
        Ok(())
    }

    fn ensure_turn_owner(state: &GameState, mark: Mark) -> Result<(), RuleError> {
        if state.current_turn() != mark {
            return Err(RuleError::invalid(MoveRejection::NotPlayerTurn {
                expected: state.current_turn(),
                actual: mark,
            }));
        }
        Ok(())
    }

    fn ensure_empty(state: &GameState, index: usize) -> Result<(), RuleError> {
        if !state.board().is_empty(index) {
            return Err(RuleError::invalid(MoveRejection::CellOccupied { index }));
        }
        Ok(())
    }

    pub fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    /// 校验全部通过后才修改状态，失败时状态保持不变。
    pub fn apply_move(
        state: &mut GameState,
        action: MoveAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_in_range(action.index)?;
        Self::ensure_in_progress(state)?;
        Self::ensure_turn_owner(state, action.mark)?;
        Self::ensure_empty(state, action.index)?;

        if !state.place(action.index, action.mark) {
            return Err(RuleError::invalid(MoveRejection::CellOccupied {
                index: action.index,
            }));
        }

        let mut events = vec![GameEvent::MovePlayed {
            mark: action.mark,
            index: action.index,
        }];

        match Self::evaluate_termination(state.board()) {
            GameStatus::InProgress => state.pass_turn(),
            status @ GameStatus::Won { mark, line } => {
                state.finish(status);
                events.push(GameEvent::GameWon { mark, line });
            }
            GameStatus::Drawn => {
                state.finish(GameStatus::Drawn);
                events.push(GameEvent::GameDrawn);
            }
        }

        Ok(events)
    }

    /// 按行、列、对角线的顺序扫描，第一条成线者获胜。
    pub fn evaluate_termination(board: &Board) -> GameStatus {
        let cells = board.cells();
        for line in WINNING_LINES {
            let [a, b, c] = line;
            if let Some(mark) = cells[a] {
                if cells[b] == Some(mark) && cells[c] == Some(mark) {
                    return GameStatus::Won { mark, line };
                }
            }
        }

        if board.is_full() {
            GameStatus::Drawn
        } else {
            GameStatus::InProgress
        }
    }

    pub fn legal_moves(state: &GameState) -> Vec<usize> {
        if state.is_finished() {
            return Vec::new();
        }
        state.board().empty_cells()
    }
}
