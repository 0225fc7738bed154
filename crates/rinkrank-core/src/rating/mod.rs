// Rating engine: ratio stitching, population normalization, fantasy points,
// and the multi-season rating aggregate.

pub mod aggregate;
pub mod fantasy;
pub mod normalize;

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use crate::bio::BioRegistry;
use crate::config::{AgeCurve, RatingConfig};
use crate::stats::{PlayerId, Season, StatStore};

pub use aggregate::RatingContext;
pub use fantasy::{fantasy_points, fantasy_ratio, normalized_fantasy_points, team_fantasy_scores};
pub use normalize::{min_max_normalize, normalize_ratios, stitch_derived_ratios};

impl AgeCurve {
    /// `1 - alpha * (age - peak)^2`, clamped to `[min, max]`.
    pub fn factor(&self, age: f64) -> f64 {
        let raw = 1.0 - self.alpha * (age - self.peak).powi(2);
        raw.clamp(self.min, self.max)
    }
}

/// Per-season tables computed once at load from the stat store.
#[derive(Debug, Clone, Default)]
pub struct DerivedTables {
    /// Season -> player -> min-max normalized fantasy points per game.
    pub fantasy_norms: BTreeMap<Season, HashMap<PlayerId, f64>>,
    /// Season -> team code -> min-max normalized team fantasy score.
    pub team_scores: BTreeMap<Season, HashMap<String, f64>>,
}

impl DerivedTables {
    pub fn fantasy_norm(&self, season: &Season, player: &PlayerId) -> Option<f64> {
        self.fantasy_norms.get(season)?.get(player).copied()
    }

    pub fn team_score(&self, season: &Season, team: &str) -> Option<f64> {
        self.team_scores.get(season)?.get(team).copied()
    }
}

/// Run every load-time derivation in order: stitch the derived ratios into
/// the `ratios` tables, build the `norms` category, then the fantasy and team
/// tables. Operates on the active roster only.
pub fn prepare(
    store: &mut StatStore,
    bios: &BioRegistry,
    roster: &[PlayerId],
    seasons: &[Season],
    config: &RatingConfig,
) -> DerivedTables {
    stitch_derived_ratios(store, bios, roster, seasons, &config.age_curve);

    let mut derived = DerivedTables::default();
    for season in seasons {
        let norms = normalize_ratios(store, roster, season);
        let normalized = norms.len();
        store.set_norms(season.clone(), norms);

        let fantasy = normalized_fantasy_points(store, roster, season, &config.fantasy_points);
        let teams = team_fantasy_scores(store, bios, roster, season, &config.fantasy_points);
        info!(
            "Season {season}: normalized {normalized} players, {} fantasy scores, {} teams",
            fantasy.len(),
            teams.len()
        );
        derived.fantasy_norms.insert(season.clone(), fantasy);
        derived.team_scores.insert(season.clone(), teams);
    }
    derived
}
