//! 游戏核心逻辑模块（状态机、规则引擎、比分与会话）。

pub mod config;
pub mod rules;
pub mod score;
pub mod session;
pub mod state;

pub use config::{ConfigError, GameMode, SessionConfig, Theme, DEFAULT_OPPONENT_DELAY_MS};
pub use rules::{MoveAction, MoveRejection, RuleEngine, RuleError, RuleResolution};
pub use score::ScoreTally;
pub use session::{OpponentTicket, Session};
pub use state::{
    Board, Cell, GameEvent, GameState, GameStatus, IntegrityError, Mark, WinningLine, BOARD_CELLS,
    WINNING_LINES,
};
