// Season subscores and the recency-weighted multi-season rating.

use crate::bio::Bio;
use crate::config::{RatingConfig, RatioSource};
use crate::stats::{PlayerId, Season, Stat, StatStore};

use super::DerivedTables;

/// Everything the aggregator reads. Ratings are recomputed on every call.
#[derive(Debug, Clone, Copy)]
pub struct RatingContext<'a> {
    pub store: &'a StatStore,
    pub derived: &'a DerivedTables,
    pub config: &'a RatingConfig,
}

impl<'a> RatingContext<'a> {
    pub fn new(store: &'a StatStore, derived: &'a DerivedTables, config: &'a RatingConfig) -> Self {
        Self {
            store,
            derived,
            config,
        }
    }

    /// One season's contribution before recency weighting.
    ///
    /// `None` when the player has no `ratios` entry for the season. A missing
    /// fantasy norm or `full` record contributes 0 for that term only.
    pub fn season_subscore(&self, player: &PlayerId, bio: &Bio, season: &Season) -> Option<f64> {
        let ratio = self.store.ratio(season, player)?;
        let norm = self.store.norm(season, player);
        let cfg = self.config;
        let w = &cfg.weights;

        let stat_values = match cfg.ratio_source {
            RatioSource::Raw => ratio.ratios,
            RatioSource::Normalized => norm?.norms,
        };
        let mut score: f64 = Stat::ALL
            .iter()
            .map(|&stat| w.stat(stat) * stat_values[stat])
            .sum();

        score += w.fantasy * self.derived.fantasy_norm(season, player).unwrap_or(0.0);

        let gp = self.store.full(season, player).map_or(0.0, |f| f.gp);
        score += w.gp * (gp / cfg.games_per_season);

        if cfg.team_term {
            score += w.team * self.derived.team_score(season, &bio.team).unwrap_or(0.0);
        }
        if cfg.age_term {
            score += w.age * norm.map_or(0.0, |n| n.age);
        }
        Some(score)
    }

    /// Recency-weighted sum of season subscores, scaled by the age curve and
    /// the team multiplier.
    pub fn rating(&self, player: &PlayerId, bio: &Bio, seasons: &[Season]) -> f64 {
        let cfg = self.config;
        let weighted: f64 = seasons
            .iter()
            .filter_map(|season| {
                self.season_subscore(player, bio, season)
                    .map(|sub| cfg.season_weight(season) * sub)
            })
            .sum();
        weighted * cfg.age_curve.factor(f64::from(bio.age)) * cfg.team_multiplier(&bio.team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::Position;
    use crate::stats::records::{FullRecord, NormRecord, RatioRecord, StatLine};
    use crate::stats::StatMap;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn season(s: &str) -> Season {
        s.parse().unwrap()
    }

    fn bio(team: &str, age: u32) -> Bio {
        Bio {
            team: team.into(),
            name: "Test".into(),
            position: Position::Forward,
            position_code: "C".into(),
            age,
            active: true,
            image: None,
            height: None,
            weight: None,
        }
    }

    fn ratio(hits: f64) -> RatioRecord {
        let mut ratios = StatMap::filled(0.0);
        ratios[Stat::Hits] = hits;
        RatioRecord { ratios, age: 1.0 }
    }

    fn full(gp: f64) -> FullRecord {
        FullRecord {
            gp,
            lines: StatMap::filled(StatLine::default()),
        }
    }

    /// Single season, one player `p` with a hits ratio and 82 games.
    fn one_season_store(hits: f64) -> (StatStore, PlayerId, Season) {
        let s = season("20242025");
        let p = PlayerId::from("p");
        let mut store = StatStore::new();
        store.insert_full_table(s.clone(), [(p.clone(), full(82.0))].into());
        store.insert_ratio_table(s.clone(), [(p.clone(), ratio(hits))].into());
        (store, p, s)
    }

    #[test]
    fn subscore_sums_weighted_terms() {
        let (store, p, s) = one_season_store(2.0);
        let mut derived = DerivedTables::default();
        derived
            .fantasy_norms
            .insert(s.clone(), [(p.clone(), 0.5)].into());
        let config = RatingConfig::default();
        let ctx = RatingContext::new(&store, &derived, &config);

        // 0.90*2.0 + 1.00*0.5 + 0.50*(82/82)
        let sub = ctx.season_subscore(&p, &bio("XXX", 30), &s).unwrap();
        assert!(approx_eq(sub, 2.8, 1e-12));
    }

    #[test]
    fn rating_applies_recency_age_and_team() {
        let (store, p, s) = one_season_store(2.0);
        let derived = DerivedTables::default();
        let config = RatingConfig::default();
        let ctx = RatingContext::new(&store, &derived, &config);

        // subscore = 0.90*2.0 + 0.50*1.0 = 2.3; recency 0.9; age 26 -> 0.96; BOS 1.09
        let r = ctx.rating(&p, &bio("BOS", 26), &[s.clone()]);
        assert!(approx_eq(r, 2.3 * 0.9 * 0.96 * 1.09, 1e-9));

        // unknown team is neutral
        let r = ctx.rating(&p, &bio("ZZZ", 30), &[s]);
        assert!(approx_eq(r, 2.3 * 0.9, 1e-9));
    }

    #[test]
    fn missing_ratio_season_contributes_zero() {
        let (store, p, s) = one_season_store(1.0);
        let derived = DerivedTables::default();
        let config = RatingConfig::default();
        let ctx = RatingContext::new(&store, &derived, &config);

        let older = season("20222023");
        assert_eq!(ctx.season_subscore(&p, &bio("ZZZ", 30), &older), None);
        let with = ctx.rating(&p, &bio("ZZZ", 30), &[older, s.clone()]);
        let without = ctx.rating(&p, &bio("ZZZ", 30), &[s]);
        assert!(approx_eq(with, without, 1e-12));
    }

    #[test]
    fn rating_monotonic_in_stat_ratio() {
        let derived = DerivedTables::default();
        let config = RatingConfig::default();
        let b = bio("TOR", 27);
        let mut last = f64::NEG_INFINITY;
        for hits in [0.0, 0.5, 1.0, 2.5, 4.0] {
            let (store, p, s) = one_season_store(hits);
            let ctx = RatingContext::new(&store, &derived, &config);
            let r = ctx.rating(&p, &b, &[s]);
            assert!(r > last, "hits {hits} gave {r}, not above {last}");
            last = r;
        }
    }

    #[test]
    fn optional_terms_follow_toggles() {
        let (mut store, p, s) = one_season_store(0.0);
        let mut norms = StatMap::filled(0.0);
        norms[Stat::Hits] = 1.0;
        store.set_norms(s.clone(), [(p.clone(), NormRecord { norms, age: 0.4 })].into());
        let mut derived = DerivedTables::default();
        derived
            .team_scores
            .insert(s.clone(), [("BOS".to_string(), 0.5)].into());
        let b = bio("BOS", 30);

        let base_cfg = RatingConfig::default();
        let base = RatingContext::new(&store, &derived, &base_cfg)
            .season_subscore(&p, &b, &s)
            .unwrap();
        assert!(approx_eq(base, 0.5, 1e-12));

        let cfg = RatingConfig {
            team_term: true,
            age_term: true,
            ..RatingConfig::default()
        };
        let sub = RatingContext::new(&store, &derived, &cfg)
            .season_subscore(&p, &b, &s)
            .unwrap();
        // + 0.20*0.5 + 0.50*0.4
        assert!(approx_eq(sub, 0.5 + 0.1 + 0.2, 1e-12));

        let cfg = RatingConfig {
            ratio_source: RatioSource::Normalized,
            ..RatingConfig::default()
        };
        let sub = RatingContext::new(&store, &derived, &cfg)
            .season_subscore(&p, &b, &s)
            .unwrap();
        // normalized hits 1.0 * 0.90 + gp term
        assert!(approx_eq(sub, 0.9 + 0.5, 1e-12));
    }
}
