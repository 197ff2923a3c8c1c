use serde::{Deserialize, Serialize};

use super::state::{GameStatus, Mark};
use crate::storage::CounterStore;

pub const X_WINS_KEY: &str = "tictactoe.score.x";
pub const O_WINS_KEY: &str = "tictactoe.score.o";
pub const DRAWS_KEY: &str = "tictactoe.score.draws";

/// 累计比分，跨对局存活。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreTally {
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
}

impl ScoreTally {
    pub fn load(store: &dyn CounterStore) -> Self {
        Self {
            x_wins: store.load_counter(X_WINS_KEY),
            o_wins: store.load_counter(O_WINS_KEY),
            draws: store.load_counter(DRAWS_KEY),
        }
    }

    pub fn wins_for(&self, mark: Mark) -> u32 {
        match mark {
            Mark::X => self.x_wins,
            Mark::O => self.o_wins,
        }
    }

    pub fn games_played(&self) -> u32 {
        self.x_wins
            .saturating_add(self.o_wins)
            .saturating_add(self.draws)
    }

    /// 记录一局终局结果，返回被修改的计数器键与新值。进行中不计数。
    pub fn record(&mut self, status: GameStatus) -> Option<(&'static str, u32)> {
        match status {
            GameStatus::InProgress => None,
            GameStatus::Won { mark: Mark::X, .. } => {
                self.x_wins = self.x_wins.saturating_add(1);
                Some((X_WINS_KEY, self.x_wins))
            }
            GameStatus::Won { mark: Mark::O, .. } => {
                self.o_wins = self.o_wins.saturating_add(1);
                Some((O_WINS_KEY, self.o_wins))
            }
            GameStatus::Drawn => {
                self.draws = self.draws.saturating_add(1);
                Some((DRAWS_KEY, self.draws))
            }
        }
    }

    pub fn entries(&self) -> [(&'static str, u32); 3] {
        [
            (X_WINS_KEY, self.x_wins),
            (O_WINS_KEY, self.o_wins),
            (DRAWS_KEY, self.draws),
        ]
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
