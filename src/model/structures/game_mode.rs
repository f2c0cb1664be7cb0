use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum_macros::EnumIter;

use crate::error::ValidationError;

/// Leaderboards are segmented by game mode. Stored as its lowercase name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Story,
    Multiplayer
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Story => "story",
            GameMode::Multiplayer => "multiplayer"
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(GameMode::Story),
            "multiplayer" => Ok(GameMode::Multiplayer),
            other => Err(ValidationError::GameMode(other.to_string()))
        }
    }
}

impl TryFrom<&str> for GameMode {
    type Error = ValidationError;

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        v.parse()
    }
}
