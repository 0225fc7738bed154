// Fantasy points per game and the team fantasy aggregate.

use std::collections::HashMap;

use crate::bio::BioRegistry;
use crate::config::FantasyPointValues;
use crate::stats::{FullRecord, PlayerId, Season, Stat, StatStore};

use super::normalize::min_max_normalize;

/// Fantasy points per game from season totals.
///
/// Returns `None` when the player has no games played.
pub fn fantasy_points(full: &FullRecord, values: &FantasyPointValues) -> Option<f64> {
    if full.gp <= 0.0 {
        return None;
    }
    let total: f64 = Stat::ALL
        .iter()
        .map(|&stat| values.value(stat) * full.line(stat).total)
        .sum();
    Some(total / full.gp)
}

/// The same weighted sum over the per-game ratio fields, divided by games
/// played. Only used for team aggregation.
pub fn fantasy_ratio(full: &FullRecord, values: &FantasyPointValues) -> Option<f64> {
    if full.gp <= 0.0 {
        return None;
    }
    let total: f64 = Stat::ALL
        .iter()
        .map(|&stat| values.value(stat) * full.line(stat).ratio)
        .sum();
    Some(total / full.gp)
}

/// Fantasy points per game for every active player in the season's `full`
/// table, min-max normalized. Players with zero games played are left out.
pub fn normalized_fantasy_points(
    store: &StatStore,
    roster: &[PlayerId],
    season: &Season,
    values: &FantasyPointValues,
) -> HashMap<PlayerId, f64> {
    min_max_normalize(roster.iter().filter_map(|id| {
        let full = store.full(season, id)?;
        fantasy_points(full, values).map(|fp| (id.clone(), fp))
    }))
}

/// Per team: summed fantasy ratios of its active players over summed games
/// played, min-max normalized across teams.
pub fn team_fantasy_scores(
    store: &StatStore,
    bios: &BioRegistry,
    roster: &[PlayerId],
    season: &Season,
    values: &FantasyPointValues,
) -> HashMap<String, f64> {
    let mut totals: HashMap<&str, (f64, f64)> = HashMap::new();
    for id in roster {
        let (Some(full), Some(bio)) = (store.full(season, id), bios.get(id)) else {
            continue;
        };
        let Some(fr) = fantasy_ratio(full, values) else {
            continue;
        };
        let entry = totals.entry(bio.team.as_str()).or_insert((0.0, 0.0));
        entry.0 += fr;
        entry.1 += full.gp;
    }

    min_max_normalize(
        totals
            .into_iter()
            .map(|(team, (fr, gp))| (team.to_string(), fr / gp)),
    )
}
