// Typed per-category records.
//
// Season files are flat JSON objects keyed by field name. Conversion to the
// typed records happens once at load time; everything downstream indexes by
// `Stat` rather than by string key.

use serde_json::{Map, Value};

use super::{Stat, StatMap};

/// A flat `field -> value` object as it appears in the season files.
pub type RawRecord = Map<String, Value>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{0}` is not a finite number")]
    NotNumeric(String),
}

/// Season total, per-game average, per-game standard deviation and
/// upstream per-game ratio for a single stat.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatLine {
    pub total: f64,
    pub avg: f64,
    pub sd: f64,
    pub ratio: f64,
}

/// A `full` category record: games played plus a [`StatLine`] per stat.
#[derive(Debug, Clone, PartialEq)]
pub struct FullRecord {
    pub gp: f64,
    pub lines: StatMap<StatLine>,
}

impl FullRecord {
    pub fn line(&self, stat: Stat) -> &StatLine {
        &self.lines[stat]
    }

    /// Build from a raw season-file object. `gp` is required; per-stat
    /// fields default to zero when absent.
    pub fn from_raw(raw: &RawRecord) -> Result<Self, RecordError> {
        let gp = number(raw, "gp")?.ok_or_else(|| RecordError::MissingField("gp".into()))?;
        let mut lines = StatMap::filled(StatLine::default());
        for stat in Stat::ALL {
            let key = stat.key();
            lines[stat] = StatLine {
                total: number(raw, key)?.unwrap_or(0.0),
                avg: number(raw, &format!("{key}_avg"))?.unwrap_or(0.0),
                sd: number(raw, &format!("{key}_sd"))?.unwrap_or(0.0),
                ratio: number(raw, &format!("{key}_ratio"))?.unwrap_or(0.0),
            };
        }
        Ok(Self { gp, lines })
    }
}

/// A `ratios` category record: one per-game ratio per stat plus the age
/// curve factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioRecord {
    pub ratios: StatMap<f64>,
    pub age: f64,
}

impl RatioRecord {
    pub fn from_raw(raw: &RawRecord) -> Result<Self, RecordError> {
        let mut ratios = StatMap::filled(0.0);
        for stat in Stat::ALL {
            ratios[stat] = number(raw, &format!("{}_ratio", stat.key()))?.unwrap_or(0.0);
        }
        let age = number(raw, "age_ratio")?.unwrap_or(0.0);
        Ok(Self { ratios, age })
    }
}

/// A derived `norms` record: every ratio rescaled to `[0, 1]` against the
/// season's active population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormRecord {
    pub norms: StatMap<f64>,
    pub age: f64,
}

/// Read a numeric field. JSON numbers and numeric strings are accepted;
/// `null` counts as absent.
fn number(raw: &RawRecord, key: &str) -> Result<Option<f64>, RecordError> {
    let parsed = match raw.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(RecordError::NotNumeric(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn full_record_reads_all_suffixes() {
        let rec = FullRecord::from_raw(&raw(json!({
            "gp": 80,
            "hits": 200,
            "hits_avg": 2.5,
            "hits_sd": 1.1,
            "hits_ratio": 3.27,
            "plusMinus": -4,
            "skaterFullName": "Some Player"
        })))
        .unwrap();

        assert_eq!(rec.gp, 80.0);
        assert_eq!(rec.line(Stat::Hits).total, 200.0);
        assert_eq!(rec.line(Stat::Hits).avg, 2.5);
        assert_eq!(rec.line(Stat::Hits).sd, 1.1);
        assert_eq!(rec.line(Stat::Hits).ratio, 3.27);
        assert_eq!(rec.line(Stat::PlusMinus).total, -4.0);
        assert_eq!(rec.line(Stat::Fights).total, 0.0);
    }

    #[test]
    fn full_record_requires_gp() {
        let err = FullRecord::from_raw(&raw(json!({"hits": 10}))).unwrap_err();
        assert_eq!(err, RecordError::MissingField("gp".into()));
    }

    #[test]
    fn numeric_strings_accepted() {
        let rec = FullRecord::from_raw(&raw(json!({"gp": "41", "pim": "12.5"}))).unwrap();
        assert_eq!(rec.gp, 41.0);
        assert_eq!(rec.line(Stat::Pim).total, 12.5);
    }

    #[test]
    fn non_numeric_value_rejected() {
        let err = FullRecord::from_raw(&raw(json!({"gp": 10, "hits": "lots"}))).unwrap_err();
        assert_eq!(err, RecordError::NotNumeric("hits".into()));

        let err = FullRecord::from_raw(&raw(json!({"gp": [1]}))).unwrap_err();
        assert_eq!(err, RecordError::NotNumeric("gp".into()));
    }

    #[test]
    fn null_counts_as_absent() {
        let rec = RatioRecord::from_raw(&raw(json!({"faceoff_ratio": null, "hits_ratio": 1.5})))
            .unwrap();
        assert_eq!(rec.ratios[Stat::Faceoff], 0.0);
        assert_eq!(rec.ratios[Stat::Hits], 1.5);
    }

    #[test]
    fn ratio_record_reads_age() {
        let rec = RatioRecord::from_raw(&raw(json!({"age_ratio": 1.1, "points_ratio": 0.8})))
            .unwrap();
        assert_eq!(rec.age, 1.1);
        assert_eq!(rec.ratios[Stat::Points], 0.8);
    }
}
