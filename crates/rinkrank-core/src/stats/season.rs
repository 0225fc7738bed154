// Season tokens and season-tagged file names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One league year, written as eight digits (`20242025`).
///
/// Ordering is lexicographic, which for this format is also chronological.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Season(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid season token `{0}`: expected 8 digits")]
pub struct SeasonError(pub String);

impl Season {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Season {
    type Err = SeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(SeasonError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Season {
    type Error = SeasonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Season> for String {
    fn from(season: Season) -> Self {
        season.0
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a season data file name into its season token and category tag.
///
/// Accepts `<8 digits>_<tag>.json` where the part after the digits starts with
/// an alphanumeric run. Multi-word stems such as `20242025_main_raw.json`
/// yield the last `_`-separated token (`raw`). Anything else returns `None`.
pub fn parse_season_file_name(name: &str) -> Option<(Season, String)> {
    let stem = name.strip_suffix(".json")?;
    let season: Season = stem.get(..8)?.parse().ok()?;
    let rest = stem.get(8..)?.strip_prefix('_')?;
    if !rest.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }
    let tag = rest.rsplit('_').next()?;
    if tag.is_empty() {
        return None;
    }
    Some((season, tag.to_string()))
}
