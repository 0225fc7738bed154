// Derived-ratio stitching and min-max population normalization.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::bio::BioRegistry;
use crate::config::AgeCurve;
use crate::stats::records::NormRecord;
use crate::stats::store::SeasonTable;
use crate::stats::{PlayerId, Season, Stat, StatMap, StatStore};

/// Rescale every value to `(v - min) / (max - min)`.
///
/// A degenerate population (`max == min`) maps every member to 0. An empty
/// population yields an empty map.
pub fn min_max_normalize<K, I>(values: I) -> HashMap<K, f64>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, f64)>,
{
    let values: Vec<(K, f64)> = values.into_iter().collect();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    values
        .into_iter()
        .map(|(k, v)| {
            let norm = if range > 0.0 { (v - min) / range } else { 0.0 };
            (k, norm)
        })
        .collect()
}

/// Copy the ratios only the `full` files carry (faceoff, fights) into the
/// `ratios` tables and set each player's age ratio from the age curve.
///
/// The age ratio only needs a bio, so every roster player with a `ratios`
/// entry gets one. Faceoff and fights are copied only when the season's
/// `full` table has the player.
pub fn stitch_derived_ratios(
    store: &mut StatStore,
    bios: &BioRegistry,
    roster: &[PlayerId],
    seasons: &[Season],
    curve: &AgeCurve,
) {
    for season in seasons {
        let mut stitched = 0usize;
        for id in roster {
            let derived = store
                .full(season, id)
                .map(|full| (full.line(Stat::Faceoff).ratio, full.line(Stat::Fights).ratio));
            let Some(ratio) = store.ratio_mut(season, id) else {
                if derived.is_some() {
                    debug!("player {id} in {season} full table but not ratios, excluded");
                }
                continue;
            };
            let Some(bio) = bios.get(id) else {
                warn!("player {id} has no bio, skipping ratio stitch");
                continue;
            };
            ratio.age = curve.factor(f64::from(bio.age));
            match derived {
                Some((faceoff, fights)) => {
                    ratio.ratios[Stat::Faceoff] = faceoff;
                    ratio.ratios[Stat::Fights] = fights;
                    stitched += 1;
                }
                None => debug!("player {id} in {season} ratios without a full record"),
            }
        }
        debug!("Season {season}: stitched derived ratios for {stitched} players");
    }
}

/// Ratios that exist only after stitching from the `full` tables.
const STITCHED: [Stat; 2] = [Stat::Faceoff, Stat::Fights];

/// Min-max normalize each stat ratio and the age ratio across the active
/// players present in the season's `ratios` table.
///
/// Faceoff and fights are normalized over the players that also have a
/// `full` record; the others sit outside that population and get 0.
pub fn normalize_ratios(
    store: &StatStore,
    roster: &[PlayerId],
    season: &Season,
) -> SeasonTable<NormRecord> {
    let population: Vec<(&PlayerId, StatMap<f64>, f64, bool)> = roster
        .iter()
        .filter_map(|id| {
            let has_full = store.full(season, id).is_some();
            store.ratio(season, id).map(|r| (id, r.ratios, r.age, has_full))
        })
        .collect();

    let per_stat: Vec<(Stat, HashMap<&PlayerId, f64>)> = Stat::ALL
        .iter()
        .map(|&stat| {
            let stitched = STITCHED.contains(&stat);
            let normed = min_max_normalize(
                population
                    .iter()
                    .filter(|(_, _, _, has_full)| *has_full || !stitched)
                    .map(|(id, r, _, _)| (*id, r[stat])),
            );
            (stat, normed)
        })
        .collect();
    let age = min_max_normalize(population.iter().map(|(id, _, a, _)| (*id, *a)));

    population
        .iter()
        .map(|(id, _, _, _)| {
            let mut norms = StatMap::filled(0.0);
            for (stat, normed) in per_stat.iter() {
                norms[*stat] = normed.get(id).copied().unwrap_or(0.0);
            }
            let record = NormRecord {
                norms,
                age: age.get(id).copied().unwrap_or(0.0),
            };
            ((*id).clone(), record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::{Bio, Position};
    use crate::stats::records::{FullRecord, RatioRecord, StatLine};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn season() -> Season {
        "20242025".parse().unwrap()
    }

    fn bio(age: u32) -> Bio {
        Bio {
            team: "BOS".into(),
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

    fn full_with_faceoff_ratio(ratio: f64) -> FullRecord {
        let mut lines = StatMap::filled(StatLine::default());
        lines[Stat::Faceoff].ratio = ratio;
        lines[Stat::Fights].ratio = ratio / 10.0;
        FullRecord { gp: 82.0, lines }
    }

    fn ratio_record(faceoff: f64) -> RatioRecord {
        let mut ratios = StatMap::filled(0.0);
        ratios[Stat::Faceoff] = faceoff;
        RatioRecord { ratios, age: 0.0 }
    }

    #[test]
    fn min_max_maps_to_unit_interval() {
        let out = min_max_normalize([("a", 0.40), ("b", 0.55), ("c", 0.70)]);
        assert!(approx_eq(out["a"], 0.0, 1e-12));
        assert!(approx_eq(out["b"], 0.5, 1e-12));
        assert!(approx_eq(out["c"], 1.0, 1e-12));
    }

    #[test]
    fn min_max_degenerate_population_is_zero() {
        let out = min_max_normalize([("a", 3.0), ("b", 3.0), ("c", 3.0)]);
        assert!(out.values().all(|&v| v == 0.0));

        let single = min_max_normalize([("only", 42.0)]);
        assert_eq!(single["only"], 0.0);
    }

    #[test]
    fn min_max_empty_population() {
        let out: HashMap<&str, f64> = min_max_normalize(Vec::new());
        assert!(out.is_empty());
    }

    #[test]
    fn min_max_handles_negative_values() {
        let out = min_max_normalize([(1, -10.0), (2, 10.0), (3, 0.0)]);
        assert!(approx_eq(out[&1], 0.0, 1e-12));
        assert!(approx_eq(out[&3], 0.5, 1e-12));
        assert!(approx_eq(out[&2], 1.0, 1e-12));
    }

    #[test]
    fn stitch_copies_full_ratios_and_sets_age() {
        let s = season();
        let a = PlayerId::from("a");
        let b = PlayerId::from("b");
        let mut store = StatStore::new();
        store.insert_full_table(
            s.clone(),
            [
                (a.clone(), full_with_faceoff_ratio(0.55)),
                (b.clone(), full_with_faceoff_ratio(0.30)),
            ]
            .into(),
        );
        // b has no ratios entry and must stay excluded.
        store.insert_ratio_table(s.clone(), [(a.clone(), ratio_record(0.0))].into());

        let bios = BioRegistry::new([(a.clone(), bio(26)), (b.clone(), bio(30))].into());
        let roster = vec![a.clone(), b.clone()];
        stitch_derived_ratios(&mut store, &bios, &roster, &[s.clone()], &AgeCurve::default());

        let r = store.ratio(&s, &a).unwrap();
        assert!(approx_eq(r.ratios[Stat::Faceoff], 0.55, 1e-12));
        assert!(approx_eq(r.ratios[Stat::Fights], 0.055, 1e-12));
        assert!(approx_eq(r.age, 0.96, 1e-12));
        assert!(store.ratio(&s, &b).is_none());
    }

    #[test]
    fn normalize_ratios_faceoff_scenario() {
        let s = season();
        let ids: Vec<PlayerId> = ["A", "B", "C"].iter().map(|&i| PlayerId::from(i)).collect();
        let mut store = StatStore::new();
        store.insert_full_table(
            s.clone(),
            ids.iter()
                .zip([0.40, 0.55, 0.70])
                .map(|(id, f)| (id.clone(), full_with_faceoff_ratio(f)))
                .collect(),
        );
        store.insert_ratio_table(
            s.clone(),
            ids.iter()
                .zip([0.40, 0.55, 0.70])
                .map(|(id, f)| (id.clone(), ratio_record(f)))
                .collect(),
        );

        let norms = normalize_ratios(&store, &ids, &s);
        assert!(approx_eq(norms[&ids[0]].norms[Stat::Faceoff], 0.0, 1e-12));
        assert!(approx_eq(norms[&ids[1]].norms[Stat::Faceoff], 0.5, 1e-12));
        assert!(approx_eq(norms[&ids[2]].norms[Stat::Faceoff], 1.0, 1e-12));
        // Every other feature is constant across the population.
        assert!(norms.values().all(|n| n.norms[Stat::Hits] == 0.0 && n.age == 0.0));
    }

    #[test]
    fn ratios_without_full_record_get_age_but_stay_out_of_stitched_populations() {
        let s = season();
        let ids: Vec<PlayerId> = ["A", "B", "C"].iter().map(|&i| PlayerId::from(i)).collect();
        let mut store = StatStore::new();
        store.insert_full_table(
            s.clone(),
            [
                (ids[0].clone(), full_with_faceoff_ratio(0.40)),
                (ids[1].clone(), full_with_faceoff_ratio(0.70)),
            ]
            .into(),
        );
        store.insert_ratio_table(
            s.clone(),
            ids.iter().map(|id| (id.clone(), ratio_record(0.0))).collect(),
        );
        let bios = BioRegistry::new(
            [(ids[0].clone(), bio(26)), (ids[1].clone(), bio(30)), (ids[2].clone(), bio(30))]
                .into(),
        );
        stitch_derived_ratios(&mut store, &bios, &ids, &[s.clone()], &AgeCurve::default());

        let c = store.ratio(&s, &ids[2]).unwrap();
        assert!(approx_eq(c.age, 1.0, 1e-12));
        assert_eq!(c.ratios[Stat::Faceoff], 0.0);

        let norms = normalize_ratios(&store, &ids, &s);
        assert_eq!(norms.len(), 3);
        assert!(approx_eq(norms[&ids[0]].norms[Stat::Faceoff], 0.0, 1e-12));
        assert!(approx_eq(norms[&ids[1]].norms[Stat::Faceoff], 1.0, 1e-12));
        assert!(approx_eq(norms[&ids[0]].norms[Stat::Fights], 0.0, 1e-12));
        assert!(approx_eq(norms[&ids[1]].norms[Stat::Fights], 1.0, 1e-12));
        assert_eq!(norms[&ids[2]].norms[Stat::Faceoff], 0.0);
        assert_eq!(norms[&ids[2]].norms[Stat::Fights], 0.0);

        assert!(approx_eq(norms[&ids[0]].age, 0.0, 1e-12));
        assert!(approx_eq(norms[&ids[1]].age, 1.0, 1e-12));
        assert!(approx_eq(norms[&ids[2]].age, 1.0, 1e-12));
    }

    #[test]
    fn normalize_ratios_ignores_players_outside_roster() {
        let s = season();
        let a = PlayerId::from("a");
        let outsider = PlayerId::from("z");
        let mut store = StatStore::new();
        store.insert_ratio_table(
            s.clone(),
            [(a.clone(), ratio_record(0.5)), (outsider.clone(), ratio_record(0.9))].into(),
        );

        let norms = normalize_ratios(&store, &[a.clone()], &s);
        assert_eq!(norms.len(), 1);
        assert_eq!(norms[&a].norms[Stat::Faceoff], 0.0);
    }

    #[test]
    fn normalized_values_stay_in_unit_interval() {
        let s = season();
        let ids: Vec<PlayerId> = (0..20).map(|i| PlayerId::new(i.to_string())).collect();
        let mut store = StatStore::new();
        store.insert_ratio_table(
            s.clone(),
            ids.iter()
                .enumerate()
                .map(|(i, id)| {
                    let x = i as f64;
                    let ratios = StatMap::from_fn(|stat| (x * 1.7 + stat.key().len() as f64).sin());
                    (id.clone(), RatioRecord { ratios, age: 0.8 + x / 100.0 })
                })
                .collect(),
        );

        let norms = normalize_ratios(&store, &ids, &s);
        for rec in norms.values() {
            for (_, v) in rec.norms.iter() {
                assert!((0.0..=1.0).contains(&v));
            }
            assert!((0.0..=1.0).contains(&rec.age));
        }
    }
}
