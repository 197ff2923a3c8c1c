use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ai::Difficulty;

/// 对手延迟落子的默认时长（毫秒）。
pub const DEFAULT_OPPONENT_DELAY_MS: u32 = 500;

pub const THEME_KEY: &str = "tictactoe.theme";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ConfigError {
    UnknownDifficulty { value: String },
    UnknownMark { value: String },
    UnknownMode { value: String },
    UnknownTheme { value: String },
    Malformed { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownDifficulty { value } => write!(f, "unknown difficulty `{value}`"),
            ConfigError::UnknownMark { value } => write!(f, "unknown mark `{value}`"),
            ConfigError::UnknownMode { value } => write!(f, "unknown game mode `{value}`"),
            ConfigError::UnknownTheme { value } => write!(f, "unknown theme `{value}`"),
            ConfigError::Malformed { message } => write!(f, "malformed configuration: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum GameMode {
    #[default]
    TwoPlayer,
    VersusComputer,
}

impl FromStr for GameMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two_player" | "pvp" | "two-player" => Ok(GameMode::TwoPlayer),
            "versus_computer" | "pvc" | "computer" | "vs-computer" => Ok(GameMode::VersusComputer),
            _ => Err(ConfigError::UnknownMode {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for GameMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ConfigError::UnknownTheme {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Theme {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 会话初始配置，前端可以以 JSON 形式传入。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawSessionConfig")]
pub struct SessionConfig {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub opponent_delay_ms: u32,
}

/// 未解析的 JSON 配置；标签在 `TryFrom` 中按 `FromStr` 解析，大小写与别名都可接受。
#[derive(Debug, Deserialize)]
struct RawSessionConfig {
    mode: Option<String>,
    difficulty: Option<String>,
    opponent_delay_ms: Option<u32>,
}

impl TryFrom<RawSessionConfig> for SessionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSessionConfig) -> Result<Self, Self::Error> {
        let defaults = SessionConfig::default();
        Ok(Self {
            mode: match raw.mode {
                Some(value) => value.parse()?,
                None => defaults.mode,
            },
            difficulty: match raw.difficulty {
                Some(value) => value.parse()?,
                None => defaults.difficulty,
            },
            opponent_delay_ms: raw.opponent_delay_ms.unwrap_or(defaults.opponent_delay_ms),
        })
    }
}

impl SessionConfig {
    /// JSON 语法或字段类型错误报告为 `Malformed`，未知标签报告为对应的 `Unknown*`。
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawSessionConfig =
            serde_json::from_str(json).map_err(|error| ConfigError::Malformed {
                message: error.to_string(),
            })?;
        raw.try_into()
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            difficulty: Difficulty::default(),
            opponent_delay_ms: DEFAULT_OPPONENT_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = SessionConfig::from_json("{}").expect("empty object is valid");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.opponent_delay_ms, DEFAULT_OPPONENT_DELAY_MS);
    }

    #[test]
    fn json_overrides_fields() {
        let config = SessionConfig::from_json(
            r#"{"mode":"versus_computer","difficulty":"hard","opponent_delay_ms":0}"#,
        )
        .expect("config should parse");
        assert_eq!(config.mode, GameMode::VersusComputer);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.opponent_delay_ms, 0);
    }

    #[test]
    fn json_tags_accept_any_case_and_aliases() {
        let config = SessionConfig::from_json(r#"{"mode":"PvC","difficulty":"Hard"}"#)
            .expect("mixed-case tags should parse");
        assert_eq!(config.mode, GameMode::VersusComputer);
        assert_eq!(config.difficulty, Difficulty::Hard);

        let config = SessionConfig::from_json(r#"{"difficulty":"normal"}"#)
            .expect("normal is an alias for medium");
        assert_eq!(config.difficulty, Difficulty::Medium);

        let theme: Theme = serde_json::from_str(r#""Dark""#).expect("theme should parse");
        assert_eq!(theme, Theme::Dark);
    }

    #[test]
    fn json_errors_are_typed() {
        assert_eq!(
            SessionConfig::from_json(r#"{"difficulty":"nightmare"}"#),
            Err(ConfigError::UnknownDifficulty {
                value: "nightmare".to_string(),
            })
        );
        assert!(matches!(
            SessionConfig::from_json(r#"{"mode":"arcade"}"#),
            Err(ConfigError::UnknownMode { .. })
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{"opponent_delay_ms":"soon"}"#),
            Err(ConfigError::Malformed { .. })
        ));
        assert!(matches!(
            SessionConfig::from_json("{"),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn serialized_config_reads_back() {
        let config = SessionConfig::default()
            .with_mode(GameMode::VersusComputer)
            .with_difficulty(Difficulty::Easy);
        let json = serde_json::to_string(&config).expect("config serializes");
        assert_eq!(SessionConfig::from_json(&json), Ok(config));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(matches!(
            "arcade".parse::<GameMode>(),
            Err(ConfigError::UnknownMode { .. })
        ));
        assert_eq!("DARK".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}
