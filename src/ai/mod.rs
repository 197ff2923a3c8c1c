//! 电脑对手策略（启发式，不做完整搜索）。

pub mod heuristic;

pub use heuristic::{
    find_completing_cell, strategic_move, AiAgent, AiConfig, AiDecision, DecisionRule, Difficulty,
};
