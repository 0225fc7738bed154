// Core stat vocabulary shared by ingestion, normalization and rating.

pub mod records;
pub mod season;
pub mod store;

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

pub use records::{FullRecord, NormRecord, RatioRecord, StatLine};
pub use season::Season;
pub use store::StatStore;

/// Opaque league-wide player identifier. Stable across seasons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Stat
// ---------------------------------------------------------------------------

/// The eight tracked skater categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Points,
    PlusMinus,
    Shg,
    Faceoff,
    Blocks,
    Hits,
    Pim,
    Fights,
}

impl Stat {
    /// Every stat, in the order the rating formula sums them.
    pub const ALL: [Stat; 8] = [
        Stat::Points,
        Stat::PlusMinus,
        Stat::Shg,
        Stat::Faceoff,
        Stat::Blocks,
        Stat::Hits,
        Stat::Pim,
        Stat::Fights,
    ];

    /// Column order used by the presentation tables.
    pub const DISPLAY_ORDER: [Stat; 8] = [
        Stat::Hits,
        Stat::Blocks,
        Stat::Pim,
        Stat::Faceoff,
        Stat::Shg,
        Stat::PlusMinus,
        Stat::Points,
        Stat::Fights,
    ];

    /// Field key used in the season data files (`plusMinus`, `plusMinus_avg`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Stat::Points => "points",
            Stat::PlusMinus => "plusMinus",
            Stat::Shg => "shg",
            Stat::Faceoff => "faceoff",
            Stat::Blocks => "blocks",
            Stat::Hits => "hits",
            Stat::Pim => "pim",
            Stat::Fights => "fights",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One value per [`Stat`], indexable by stat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatMap<T>([T; 8]);

impl<T: Copy> StatMap<T> {
    pub fn filled(value: T) -> Self {
        Self([value; 8])
    }

    pub fn from_fn(mut f: impl FnMut(Stat) -> T) -> Self {
        Self(Stat::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stat, T)> + '_ {
        Stat::ALL.iter().map(move |&s| (s, self[s]))
    }
}

impl<T> Index<Stat> for StatMap<T> {
    type Output = T;

    fn index(&self, stat: Stat) -> &T {
        &self.0[stat.index()]
    }
}

impl<T> IndexMut<Stat> for StatMap<T> {
    fn index_mut(&mut self, stat: Stat) -> &mut T {
        &mut self.0[stat.index()]
    }
}
