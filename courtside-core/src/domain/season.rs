//! Season identifiers in the upstream `YYYY-YY` form (e.g. `2024-25`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeasonError {
    #[error("season '{0}' is not in YYYY-YY form")]
    Malformed(String),

    #[error("season '{0}' does not span consecutive years")]
    NotConsecutive(String),
}

/// A validated season label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn from_start_year(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// The season before this one (`2024-25` → `2023-24`).
    pub fn previous(&self) -> Self {
        Self {
            start_year: self.start_year - 1,
        }
    }
}

impl FromStr for Season {
    type Err = SeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| SeasonError::Malformed(s.to_string()))?;
        if start.len() != 4 || end.len() != 2 {
            return Err(SeasonError::Malformed(s.to_string()));
        }
        let start_year: i32 = start
            .parse()
            .map_err(|_| SeasonError::Malformed(s.to_string()))?;
        let end_suffix: i32 = end
            .parse()
            .map_err(|_| SeasonError::Malformed(s.to_string()))?;
        if (start_year + 1) % 100 != end_suffix {
            return Err(SeasonError::NotConsecutive(s.to_string()));
        }
        Ok(Self { start_year })
    }
}

impl TryFrom<String> for Season {
    type Error = SeasonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Season> for String {
    fn from(season: Season) -> Self {
        season.to_string()
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}
