use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::game::{Board, ConfigError, Mark, WINNING_LINES};

const CENTER: usize = 4;
const CORNERS: [usize; 4] = [0, 2, 6, 8];
const EDGES: [usize; 4] = [1, 3, 5, 7];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ConfigError::UnknownDifficulty {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    pub difficulty: Difficulty,
    /// 使用策略评估的概率，其余情况随机落子。
    pub strategic_chance: f64,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let strategic_chance = match difficulty {
            Difficulty::Easy => 0.0,
            Difficulty::Medium => 0.7,
            Difficulty::Hard => 1.0,
        };
        Self {
            difficulty,
            strategic_chance,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(Difficulty::default())
    }
}

/// 触发落子的策略规则，按优先级排列。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    Win,
    Block,
    Center,
    Corner,
    Edge,
    Random,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub rule: DecisionRule,
    pub mark: Mark,
    pub difficulty: Difficulty,
}

/// 在一条线上寻找“两子加一空”的空位，依次检查空位在第三、第二、第一格。
fn completing_cell(board: &Board, line: [usize; 3], mark: Mark) -> Option<usize> {
    let cells = board.cells();
    let [a, b, c] = line;
    let own = |index: usize| cells[index] == Some(mark);
    let empty = |index: usize| cells[index].is_none();

    if own(a) && own(b) && empty(c) {
        Some(c)
    } else if own(a) && own(c) && empty(b) {
        Some(b)
    } else if own(b) && own(c) && empty(a) {
        Some(a)
    } else {
        None
    }
}

pub fn find_completing_cell(board: &Board, mark: Mark) -> Option<usize> {
    WINNING_LINES
        .iter()
        .find_map(|&line| completing_cell(board, line, mark))
}

/// 确定性的策略评估：取胜、阻挡、中心、角、边。棋盘已满时返回 `None`。
pub fn strategic_move(board: &Board, mark: Mark) -> Option<(usize, DecisionRule)> {
    if let Some(index) = find_completing_cell(board, mark) {
        return Some((index, DecisionRule::Win));
    }
    if let Some(index) = find_completing_cell(board, mark.opponent()) {
        return Some((index, DecisionRule::Block));
    }
    if board.is_empty(CENTER) {
        return Some((CENTER, DecisionRule::Center));
    }
    if let Some(&index) = CORNERS.iter().find(|&&index| board.is_empty(index)) {
        return Some((index, DecisionRule::Corner));
    }
    EDGES
        .iter()
        .find(|&&index| board.is_empty(index))
        .map(|&index| (index, DecisionRule::Edge))
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> AiConfig {
        self.config
    }

    /// 难度可以在对局中修改，下一手生效。
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.config = AiConfig::from_difficulty(difficulty);
    }

    fn random_move(&mut self, board: &Board) -> Option<usize> {
        board.empty_cells().choose(&mut self.rng).copied()
    }

    fn random_decision(&mut self, board: &Board, mark: Mark) -> AiDecision {
        AiDecision {
            index: self.random_move(board),
            rule: DecisionRule::Random,
            mark,
            difficulty: self.config.difficulty,
        }
    }

    fn use_strategy(&mut self) -> bool {
        let chance = self.config.strategic_chance;
        if chance >= 1.0 {
            true
        } else if chance <= 0.0 {
            false
        } else {
            self.rng.gen_bool(chance)
        }
    }

    pub fn decide_move(&mut self, board: &Board, mark: Mark) -> AiDecision {
        if board.is_full() || !self.use_strategy() {
            return self.random_decision(board, mark);
        }

        match strategic_move(board, mark) {
            Some((index, rule)) => AiDecision {
                index: Some(index),
                rule,
                mark,
                difficulty: self.config.difficulty,
            },
            None => self.random_decision(board, mark),
        }
    }
}
