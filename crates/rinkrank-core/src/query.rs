// Read-only queries over the engine: per-season tables, player histories,
// ratings and name lookup.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::annotations::Annotation;
use crate::bio::{Bio, Position};
use crate::engine::Engine;
use crate::rating::fantasy_points;
use crate::stats::{FullRecord, PlayerId, Season, Stat, StatLine, StatMap};

// ---------------------------------------------------------------------------
// Dataset selector
// ---------------------------------------------------------------------------

/// Which [`StatLine`] field a table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Totals,
    Averages,
    Deviations,
    Ratios,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::Totals,
        Dataset::Averages,
        Dataset::Deviations,
        Dataset::Ratios,
    ];

    /// Column suffix appended to each stat key.
    pub fn suffix(self) -> &'static str {
        match self {
            Dataset::Totals => "",
            Dataset::Averages => "_avg",
            Dataset::Deviations => "_sd",
            Dataset::Ratios => "_ratio",
        }
    }

    pub fn value(self, line: &StatLine) -> f64 {
        match self {
            Dataset::Totals => line.total,
            Dataset::Averages => line.avg,
            Dataset::Deviations => line.sd,
            Dataset::Ratios => line.ratio,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Totals => "totals",
            Dataset::Averages => "averages",
            Dataset::Deviations => "deviations",
            Dataset::Ratios => "ratios",
        }
    }

    fn extract(self, full: &FullRecord) -> StatMap<f64> {
        StatMap::from_fn(|stat| self.value(full.line(stat)))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown dataset `{0}` (expected totals, averages, deviations or ratios)")]
pub struct DatasetError(pub String);

impl FromStr for Dataset {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "totals" | "total" => Ok(Dataset::Totals),
            "averages" | "avg" => Ok(Dataset::Averages),
            "deviations" | "std" | "sd" => Ok(Dataset::Deviations),
            "ratios" | "ratio" => Ok(Dataset::Ratios),
            _ => Err(DatasetError(s.to_string())),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One value in a flattened output row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Empty => Ok(()),
        }
    }
}

/// Bio columns shared by every table row.
#[derive(Debug, Clone, PartialEq)]
pub struct BioBase {
    pub team: String,
    pub id: PlayerId,
    pub name: String,
    pub position: Position,
    pub position_code: String,
    pub age: u32,
}

impl BioBase {
    fn new(id: &PlayerId, bio: &Bio) -> Self {
        Self {
            team: bio.team.clone(),
            id: id.clone(),
            name: bio.name.clone(),
            position: bio.position,
            position_code: bio.position_code.clone(),
            age: bio.age,
        }
    }
}

/// One player's figures for one season.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRow {
    /// Picked flag and bio columns; absent in player histories.
    pub picked: Option<bool>,
    pub base: Option<BioBase>,
    /// Set in player histories only.
    pub season: Option<Season>,
    pub gp: f64,
    /// Multi-season rating; absent where the table omits it.
    pub rating: Option<f64>,
    /// Fantasy points per game; `None` when the player has no games played.
    pub fp_per_gp: Option<f64>,
    /// Stat columns, one block per dataset, in output order.
    pub stats: Vec<(Dataset, StatMap<f64>)>,
}

impl PlayerRow {
    pub fn stat(&self, dataset: Dataset, stat: Stat) -> Option<f64> {
        self.stats
            .iter()
            .find(|(d, _)| *d == dataset)
            .map(|(_, values)| values[stat])
    }

    /// Ordered `(column, cell)` pairs for tabular output.
    pub fn to_flat(&self) -> Vec<(String, Cell)> {
        let mut out = Vec::with_capacity(8 + self.stats.len() * Stat::DISPLAY_ORDER.len());
        if let Some(picked) = self.picked {
            out.push(("Picked".to_string(), Cell::Bool(picked)));
        }
        if let Some(base) = &self.base {
            out.push(("Team".to_string(), Cell::Text(base.team.clone())));
            out.push(("ID".to_string(), Cell::Text(base.id.to_string())));
            out.push(("Name".to_string(), Cell::Text(base.name.clone())));
            out.push(("Pos".to_string(), Cell::Text(base.position_code.clone())));
            out.push(("Age".to_string(), Cell::Int(i64::from(base.age))));
        }
        if let Some(season) = &self.season {
            out.push(("season".to_string(), Cell::Text(season.to_string())));
        }
        out.push(("GP".to_string(), Cell::Number(self.gp)));
        if let Some(rating) = self.rating {
            out.push(("Rating".to_string(), Cell::Number(rating)));
        }
        out.push((
            "FP/GP".to_string(),
            self.fp_per_gp.map_or(Cell::Empty, Cell::Number),
        ));
        for (dataset, values) in &self.stats {
            for stat in Stat::DISPLAY_ORDER {
                out.push((
                    format!("{}{}", stat.key(), dataset.suffix()),
                    Cell::Number(values[stat]),
                ));
            }
        }
        out
    }
}

/// Per-season rows for one player plus the seasons they have no data for.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerHistory {
    pub player: PlayerId,
    pub rows: Vec<PlayerRow>,
    pub missing_seasons: Vec<Season>,
}

/// One entry of the ranking table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPlayer {
    pub rank: usize,
    pub id: PlayerId,
    pub rating: f64,
    pub bio: Bio,
    pub annotation: Annotation,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl Engine {
    /// One row per active player (roster order) present in the season's
    /// `full` table, with the given dataset's stat columns.
    pub fn dataset_rows(&self, season: &Season, dataset: Dataset) -> Vec<PlayerRow> {
        self.season_rows(season, &[dataset])
    }

    /// Every dataset for one season. Stat blocks follow ratios, totals,
    /// averages, deviations.
    pub fn fullset(&self, season: &Season) -> Vec<PlayerRow> {
        self.season_rows(
            season,
            &[
                Dataset::Ratios,
                Dataset::Totals,
                Dataset::Averages,
                Dataset::Deviations,
            ],
        )
    }

    fn season_rows(&self, season: &Season, datasets: &[Dataset]) -> Vec<PlayerRow> {
        let ctx = self.rating_context();
        let values = &self.rating_config().fantasy_points;
        self.roster()
            .iter()
            .filter_map(|id| {
                let full = self.store().full(season, id)?;
                let bio = self.bios().get(id)?;
                Some(PlayerRow {
                    picked: Some(self.annotation_or_default(id).picked),
                    base: Some(BioBase::new(id, bio)),
                    season: None,
                    gp: full.gp,
                    rating: Some(ctx.rating(id, bio, self.seasons())),
                    fp_per_gp: fantasy_points(full, values),
                    stats: datasets.iter().map(|&d| (d, d.extract(full))).collect(),
                })
            })
            .collect()
    }

    /// One unrated row per configured season the player appears in. Seasons
    /// without a `full` record are logged and listed in `missing_seasons`.
    pub fn player_history(&self, player: &PlayerId) -> PlayerHistory {
        let values = &self.rating_config().fantasy_points;
        let mut rows = Vec::new();
        let mut missing_seasons = Vec::new();
        for season in self.seasons() {
            match self.store().full(season, player) {
                Some(full) => rows.push(PlayerRow {
                    picked: None,
                    base: None,
                    season: Some(season.clone()),
                    gp: full.gp,
                    rating: None,
                    fp_per_gp: fantasy_points(full, values),
                    stats: [
                        Dataset::Totals,
                        Dataset::Ratios,
                        Dataset::Averages,
                        Dataset::Deviations,
                    ]
                    .iter()
                    .map(|&d| (d, d.extract(full)))
                    .collect(),
                }),
                None => {
                    warn!("player {player} not found in {season}");
                    missing_seasons.push(season.clone());
                }
            }
        }
        PlayerHistory {
            player: player.clone(),
            rows,
            missing_seasons,
        }
    }

    pub fn bio(&self, player: &PlayerId) -> Option<&Bio> {
        self.bios().get(player)
    }

    /// `(id, rating)` for every active player, in roster order.
    pub fn ratings(&self) -> Vec<(PlayerId, f64)> {
        let ctx = self.rating_context();
        self.roster()
            .iter()
            .filter_map(|id| {
                let bio = self.bios().get(id)?;
                Some((id.clone(), ctx.rating(id, bio, self.seasons())))
            })
            .collect()
    }

    /// Ratings sorted best first. Ties keep roster order.
    pub fn rankings(&self) -> Vec<RankedPlayer> {
        let mut rated = self.ratings();
        rated.sort_by(|a, b| b.1.total_cmp(&a.1));
        rated
            .into_iter()
            .enumerate()
            .filter_map(|(i, (id, rating))| {
                let bio = self.bios().get(&id)?.clone();
                let annotation = self.annotation_or_default(&id);
                Some(RankedPlayer {
                    rank: i + 1,
                    id,
                    rating,
                    bio,
                    annotation,
                })
            })
            .collect()
    }

    /// Active players whose id matches exactly or whose name contains
    /// `query` (case-insensitive), in roster order.
    pub fn find_players(&self, query: &str) -> Vec<PlayerId> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let id = PlayerId::from(query);
        if self.is_active(&id) {
            return vec![id];
        }
        let needle = query.to_lowercase();
        self.roster()
            .iter()
            .filter(|id| {
                self.bios()
                    .get(id)
                    .is_some_and(|bio| bio.name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    fn annotation_or_default(&self, player: &PlayerId) -> Annotation {
        self.annotations().get(player).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_parse_and_suffix() {
        assert_eq!("Averages".parse::<Dataset>(), Ok(Dataset::Averages));
        assert_eq!("std".parse::<Dataset>(), Ok(Dataset::Deviations));
        assert!("fullset".parse::<Dataset>().is_err());
        assert_eq!(Dataset::Ratios.suffix(), "_ratio");
        assert_eq!(Dataset::Totals.suffix(), "");
    }

    #[test]
    fn dataset_selects_stat_line_field() {
        let line = StatLine {
            total: 1.0,
            avg: 2.0,
            sd: 3.0,
            ratio: 4.0,
        };
        let picked: Vec<f64> = Dataset::ALL.iter().map(|d| d.value(&line)).collect();
        assert_eq!(picked, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn flat_row_column_order() {
        let row = PlayerRow {
            picked: Some(true),
            base: Some(BioBase {
                team: "BOS".into(),
                id: PlayerId::from("7"),
                name: "Seven".into(),
                position: Position::Defense,
                position_code: "D".into(),
                age: 25,
            }),
            season: None,
            gp: 60.0,
            rating: Some(3.5),
            fp_per_gp: None,
            stats: vec![(Dataset::Averages, StatMap::filled(1.0))],
        };
        let flat = row.to_flat();
        let columns: Vec<&str> = flat.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(
            &columns[..9],
            &["Picked", "Team", "ID", "Name", "Pos", "Age", "GP", "Rating", "FP/GP"]
        );
        assert_eq!(columns[9], "hits_avg");
        assert_eq!(columns[16], "fights_avg");
        assert_eq!(flat.len(), 17);
        assert_eq!(flat[8].1, Cell::Empty);
        assert_eq!(flat[4].1.to_string(), "D");
    }

    #[test]
    fn history_row_has_season_and_no_bio() {
        let row = PlayerRow {
            picked: None,
            base: None,
            season: Some("20232024".parse().unwrap()),
            gp: 10.0,
            rating: None,
            fp_per_gp: Some(1.25),
            stats: vec![],
        };
        let flat = row.to_flat();
        let columns: Vec<&str> = flat.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["season", "GP", "FP/GP"]);
        assert_eq!(flat[2].1.to_string(), "1.25");
    }
}
