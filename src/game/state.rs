use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::config::ConfigError;
use super::rules::{MoveAction, RuleEngine};

/// 棋盘格子数量（固定 3×3）。
pub const BOARD_CELLS: usize = 9;

/// 八条胜利线：先行，再列，最后对角线。
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 一条胜利线上的三个格子索引。
pub type WinningLine = [usize; 3];

/// 棋子标记，X 永远先手。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mark {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Mark::X),
            "o" => Ok(Mark::O),
            _ => Err(ConfigError::UnknownMark {
                value: s.to_string(),
            }),
        }
    }
}

/// 单个格子：`None` 表示空位。
pub type Cell = Option<Mark>;

/// 3×3 棋盘，按行优先存储。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Cell; BOARD_CELLS]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn is_empty(&self, index: usize) -> bool {
        matches!(self.get(index), Some(None))
    }

    pub fn empty_cells(&self) -> Vec<usize> {
        (0..BOARD_CELLS).filter(|&index| self.is_empty(index)).collect()
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn count_of(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(mark)).count()
    }

    /// 只允许写入空格子，已有棋子的格子永不覆盖。
    pub(crate) fn place(&mut self, index: usize, mark: Mark) -> bool {
        match self.cells.get_mut(index) {
            Some(cell @ None) => {
                *cell = Some(mark);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for cell in chunk {
                let symbol = match cell {
                    Some(mark) => mark.as_str(),
                    None => ".",
                };
                f.write_str(symbol)?;
            }
        }
        Ok(())
    }
}

/// 对局状态；进入终局后不可回到进行中，除非重开。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameStatus {
    InProgress,
    Won { mark: Mark, line: WinningLine },
    Drawn,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self {
            GameStatus::Won { mark, .. } => Some(*mark),
            _ => None,
        }
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        GameStatus::InProgress
    }
}

/// 游戏事件流，供前端增量渲染。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MovePlayed { mark: Mark, index: usize },
    GameWon { mark: Mark, line: WinningLine },
    GameDrawn,
    GameReset,
    ScoresReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    MoveCountMismatch { filled: usize, history: usize },
    TurnMismatch { expected: Mark, actual: Mark },
    IllegalHistory { step: usize, index: usize },
    BoardMismatch { expected: Board, actual: Board },
    StatusMismatch { expected: GameStatus, actual: GameStatus },
}

/// 单局对局状态：棋盘、轮次与结果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    current_turn: Mark,
    #[serde(default)]
    status: GameStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    history: Vec<usize>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_turn: Mark::X,
            status: GameStatus::InProgress,
            history: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_turn(&self) -> Mark {
        self.current_turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// 丢弃棋盘内容，回到初始状态。
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 未校验的落子，校验由 `RuleEngine::apply_move` 负责。
    pub(super) fn place(&mut self, index: usize, mark: Mark) -> bool {
        if !self.board.place(index, mark) {
            return false;
        }
        self.history.push(index);
        true
    }

    pub(super) fn pass_turn(&mut self) {
        self.current_turn = self.current_turn.opponent();
    }

    pub(super) fn finish(&mut self, status: GameStatus) {
        if !self.status.is_terminal() {
            self.status = status;
        }
    }

    /// 从空棋盘按 `history` 重放，结果必须与当前棋盘、状态和轮次完全一致。
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let filled = self.board.filled_count();
        if filled != self.history.len() {
            return Err(IntegrityError::MoveCountMismatch {
                filled,
                history: self.history.len(),
            });
        }

        let mut replay = GameState::new();
        for (step, &index) in self.history.iter().enumerate() {
            let action = MoveAction::new(index, replay.current_turn());
            RuleEngine::apply_move(&mut replay, action)
                .map_err(|_| IntegrityError::IllegalHistory { step, index })?;
        }

        if replay.board != self.board {
            return Err(IntegrityError::BoardMismatch {
                expected: replay.board,
                actual: self.board,
            });
        }
        if replay.status != self.status {
            return Err(IntegrityError::StatusMismatch {
                expected: replay.status,
                actual: self.status,
            });
        }
        if replay.current_turn != self.current_turn {
            return Err(IntegrityError::TurnMismatch {
                expected: replay.current_turn,
                actual: self.current_turn,
            });
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
