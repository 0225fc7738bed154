// Player biographical registry and the active roster list.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::stats::PlayerId;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Skater position group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Forward,
    Defense,
}

impl Position {
    /// Parse a position code. Centers and wingers are forwards.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "D" | "DEF" | "DEFENSE" => Some(Position::Defense),
            "F" | "C" | "L" | "R" | "LW" | "RW" | "W" | "FWD" | "FORWARD" => {
                Some(Position::Forward)
            }
            _ => None,
        }
    }
}

/// Immutable biographical record for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Bio {
    pub team: String,
    pub name: String,
    pub position: Position,
    /// Position code as the bio file gives it (C, LW, D, ...), upper-cased.
    pub position_code: String,
    pub age: u32,
    pub active: bool,
    pub image: Option<String>,
    pub height: Option<serde_json::Value>,
    pub weight: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Raw serde struct (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBio {
    #[serde(default)]
    team: String,
    name: String,
    position: String,
    age: f64,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    height: Option<serde_json::Value>,
    #[serde(default)]
    weight: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Player id -> [`Bio`]. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct BioRegistry {
    bios: HashMap<PlayerId, Bio>,
}

impl BioRegistry {
    pub fn new(bios: HashMap<PlayerId, Bio>) -> Self {
        Self { bios }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let registry = Self::from_reader(file).map_err(|e| LoadError::Json {
            path: path.display().to_string(),
            source: e,
        })?;
        info!("Loaded {} player bios from {}", registry.len(), path.display());
        Ok(registry)
    }

    fn from_reader<R: Read>(rdr: R) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_reader(rdr)?;
        let mut bios = HashMap::with_capacity(raw.len());
        for (id, value) in raw {
            let parsed: RawBio = match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("skipping malformed bio for player {id}: {e}");
                    continue;
                }
            };
            let Some(position) = Position::from_code(&parsed.position) else {
                warn!("skipping bio for player {id}: unknown position '{}'", parsed.position);
                continue;
            };
            if !parsed.age.is_finite() || parsed.age < 0.0 {
                warn!("skipping bio for player {id}: invalid age {}", parsed.age);
                continue;
            }
            bios.insert(
                PlayerId::new(id),
                Bio {
                    team: parsed.team.trim().to_string(),
                    name: parsed.name.trim().to_string(),
                    position,
                    position_code: parsed.position.trim().to_uppercase(),
                    age: parsed.age.round() as u32,
                    active: parsed.active,
                    image: parsed.image,
                    height: parsed.height,
                    weight: parsed.weight,
                },
            );
        }
        Ok(Self { bios })
    }

    pub fn get(&self, player: &PlayerId) -> Option<&Bio> {
        self.bios.get(player)
    }

    pub fn len(&self) -> usize {
        self.bios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bios.is_empty()
    }

    /// Keep only ids that have a bio marked active, preserving order and
    /// dropping duplicates.
    pub fn filter_active(&self, ids: impl IntoIterator<Item = PlayerId>) -> Vec<PlayerId> {
        let mut seen = HashSet::new();
        let mut active = Vec::new();
        for id in ids {
            match self.bios.get(&id) {
                Some(bio) if bio.active => {
                    if seen.insert(id.clone()) {
                        active.push(id);
                    }
                }
                Some(_) => {}
                None => warn!("roster player {id} has no bio, skipping"),
            }
        }
        active
    }
}

// ---------------------------------------------------------------------------
// Roster list
// ---------------------------------------------------------------------------

/// Load the roster list (one id per line) and keep only active players.
pub fn load_roster(path: &Path, bios: &BioRegistry) -> Result<Vec<PlayerId>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let ids = read_roster_ids(file).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let total = ids.len();
    let active = bios.filter_active(ids);
    info!("Roster: {} of {} listed players active", active.len(), total);
    Ok(active)
}

fn read_roster_ids<R: Read>(rdr: R) -> std::io::Result<Vec<PlayerId>> {
    let mut ids = Vec::new();
    for line in BufReader::new(rdr).lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            ids.push(PlayerId::new(trimmed));
        }
    }
    Ok(ids)
}
