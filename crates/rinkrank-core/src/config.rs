// Configuration loading and parsing (league.toml, weights.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::stats::{Season, Stat};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub rating: RatingConfig,
    pub data_paths: DataPaths,
    /// Directory the relative data paths are resolved against.
    pub base_dir: PathBuf,
}

impl Config {
    /// Resolve a configured data path against `base_dir`. Absolute paths are
    /// returned unchanged.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Seasons to process, in any order. Never discovered from disk.
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub stats_dir: String,
    pub bios: String,
    pub roster: String,
    pub annotations: String,
}

// ---------------------------------------------------------------------------
// weights.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire weights.toml file.
#[derive(Debug, Clone, Deserialize)]
struct WeightsFile {
    rating: RatingSection,
    stat_weights: StatWeights,
    season_weights: BTreeMap<Season, f64>,
    team_multipliers: HashMap<String, f64>,
    age_curve: AgeCurve,
    fantasy_points: FantasyPointValues,
}

#[derive(Debug, Clone, Deserialize)]
struct RatingSection {
    games_per_season: f64,
    #[serde(default)]
    ratio_source: RatioSource,
    #[serde(default)]
    team_term: bool,
    #[serde(default)]
    age_term: bool,
}

/// Which per-stat values feed the eight stat terms of the season subscore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioSource {
    /// The per-game `ratios` values.
    #[default]
    Raw,
    /// The population-normalized `norms` values.
    Normalized,
}

/// Immutable rating parameters handed to the aggregator.
#[derive(Debug, Clone)]
pub struct RatingConfig {
    /// Regular-season game count used for the games-played fraction.
    pub games_per_season: f64,
    pub ratio_source: RatioSource,
    /// Add `weights.team * team_fantasy_score` to each season subscore.
    pub team_term: bool,
    /// Add `weights.age * age_norm` to each season subscore.
    pub age_term: bool,
    pub weights: StatWeights,
    pub season_weights: BTreeMap<Season, f64>,
    pub team_multipliers: HashMap<String, f64>,
    pub age_curve: AgeCurve,
    pub fantasy_points: FantasyPointValues,
}

impl RatingConfig {
    /// Recency weight for a season; seasons without a weight count for nothing.
    pub fn season_weight(&self, season: &Season) -> f64 {
        self.season_weights.get(season).copied().unwrap_or(0.0)
    }

    /// Team strength multiplier; unknown team codes are neutral.
    pub fn team_multiplier(&self, team: &str) -> f64 {
        self.team_multipliers.get(team).copied().unwrap_or(1.0)
    }
}

/// Per-term weights of the season subscore.
#[derive(Debug, Clone, Deserialize)]
pub struct StatWeights {
    pub points: f64,
    #[serde(alias = "plusMinus")]
    pub plus_minus: f64,
    pub shg: f64,
    pub faceoff: f64,
    pub blocks: f64,
    pub hits: f64,
    pub pim: f64,
    pub fights: f64,
    pub gp: f64,
    pub age: f64,
    #[serde(alias = "fr")]
    pub fantasy: f64,
    pub team: f64,
}

impl StatWeights {
    pub fn stat(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Points => self.points,
            Stat::PlusMinus => self.plus_minus,
            Stat::Shg => self.shg,
            Stat::Faceoff => self.faceoff,
            Stat::Blocks => self.blocks,
            Stat::Hits => self.hits,
            Stat::Pim => self.pim,
            Stat::Fights => self.fights,
        }
    }
}

/// Quadratic age curve parameters: `1 - alpha * (age - peak)^2`, clamped.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AgeCurve {
    pub peak: f64,
    pub alpha: f64,
    pub min: f64,
    pub max: f64,
}

/// Fantasy point value of one unit of each stat.
#[derive(Debug, Clone, Deserialize)]
pub struct FantasyPointValues {
    pub points: f64,
    #[serde(alias = "plusMinus")]
    pub plus_minus: f64,
    pub faceoff: f64,
    pub shg: f64,
    pub blocks: f64,
    pub pim: f64,
    pub hits: f64,
    #[serde(default)]
    pub fights: f64,
}

impl FantasyPointValues {
    pub fn value(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Points => self.points,
            Stat::PlusMinus => self.plus_minus,
            Stat::Shg => self.shg,
            Stat::Faceoff => self.faceoff,
            Stat::Blocks => self.blocks,
            Stat::Hits => self.hits,
            Stat::Pim => self.pim,
            Stat::Fights => self.fights,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in defaults (mirrors defaults/weights.toml)
// ---------------------------------------------------------------------------

impl Default for StatWeights {
    fn default() -> Self {
        Self {
            points: 0.10,
            plus_minus: 0.25,
            shg: 0.20,
            faceoff: 0.45,
            blocks: 0.65,
            hits: 0.90,
            pim: 0.65,
            fights: 0.80,
            gp: 0.50,
            age: 0.50,
            fantasy: 1.00,
            team: 0.20,
        }
    }
}

impl Default for AgeCurve {
    fn default() -> Self {
        Self {
            peak: 30.0,
            alpha: 0.0025,
            min: 0.8,
            max: 1.2,
        }
    }
}

impl Default for FantasyPointValues {
    fn default() -> Self {
        Self {
            points: 0.5,
            plus_minus: 2.0,
            faceoff: 1.0,
            shg: 2.0,
            blocks: 3.0,
            pim: 5.0,
            hits: 7.0,
            fights: 0.0,
        }
    }
}

const DEFAULT_SEASON_WEIGHTS: &[(&str, f64)] = &[
    ("20222023", 0.3),
    ("20232024", 0.5),
    ("20242025", 0.9),
];

const DEFAULT_TEAM_MULTIPLIERS: &[(&str, f64)] = &[
    ("ARI", 0.99),
    ("ANA", 1.01),
    ("BOS", 1.09),
    ("BUF", 1.02),
    ("CGY", 1.05),
    ("CAR", 0.99),
    ("CBJ", 1.06),
    ("CHI", 0.94),
    ("COL", 0.93),
    ("DAL", 0.91),
    ("DET", 1.01),
    ("EDM", 0.90),
    ("FLA", 1.10),
    ("LAK", 0.98),
    ("MIN", 0.92),
    ("MTL", 1.07),
    ("NSH", 1.03),
    ("NJD", 1.04),
    ("NYI", 1.01),
    ("NYR", 1.06),
    ("OTT", 1.07),
    ("PHI", 1.02),
    ("PIT", 0.99),
    ("SJS", 0.95),
    ("SEA", 0.98),
    ("STL", 1.02),
    ("TBL", 0.94),
    ("TOR", 1.06),
    ("VAN", 1.09),
    ("VGK", 0.98),
    ("WPG", 1.04),
];

impl Default for RatingConfig {
    fn default() -> Self {
        let season_weights = DEFAULT_SEASON_WEIGHTS
            .iter()
            .filter_map(|&(s, w)| s.parse().ok().map(|season| (season, w)))
            .collect();
        let team_multipliers = DEFAULT_TEAM_MULTIPLIERS
            .iter()
            .map(|&(t, m)| (t.to_string(), m))
            .collect();
        Self {
            games_per_season: 82.0,
            ratio_source: RatioSource::Raw,
            team_term: false,
            age_term: false,
            weights: StatWeights::default(),
            season_weights,
            team_multipliers,
            age_curve: AgeCurve::default(),
            fantasy_points: FantasyPointValues::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Files read from `config/`, in load order.
pub const CONFIG_FILES: [&str; 2] = ["league.toml", "weights.toml"];

/// Load and validate configuration from `config/league.toml` and
/// `config/weights.toml` relative to `base_dir`.
///
/// Does not copy defaults; see [`load_config_at`].
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let [league_name, weights_name] = CONFIG_FILES;

    // --- league.toml (required) ---
    let league_path = config_dir.join(league_name);
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    // --- weights.toml (required) ---
    let weights_path = config_dir.join(weights_name);
    let weights_text = read_file(&weights_path)?;
    let weights_file: WeightsFile =
        toml::from_str(&weights_text).map_err(|e| ConfigError::ParseError {
            path: weights_path.clone(),
            source: e,
        })?;

    let rating = RatingConfig {
        games_per_season: weights_file.rating.games_per_season,
        ratio_source: weights_file.rating.ratio_source,
        team_term: weights_file.rating.team_term,
        age_term: weights_file.rating.age_term,
        weights: weights_file.stat_weights,
        season_weights: weights_file.season_weights,
        team_multipliers: weights_file.team_multipliers,
        age_curve: weights_file.age_curve,
        fantasy_points: weights_file.fantasy_points,
    };

    let config = Config {
        league: league_file.league,
        rating,
        data_paths: league_file.data_paths,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` with whichever of [`CONFIG_FILES`] it lacks, taken from
/// `defaults/`. Files already in `config/` are never overwritten. Returns
/// the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(copy_error(format!(
            "neither defaults/ nor config/ directory found in {}; \
             run from the project root or pass --base-dir",
            base_dir.display()
        )));
    }

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            warn!("{} missing, cannot seed {}", source.display(), target.display());
            continue;
        }
        std::fs::create_dir_all(&config_dir)
            .map_err(|e| copy_error(format!("failed to create {}: {e}", config_dir.display())))?;
        std::fs::copy(&source, &target).map_err(|e| {
            copy_error(format!("failed to copy {} to {}: {e}", source.display(), target.display()))
        })?;
        info!("Seeded {} from defaults", target.display());
        copied.push(target);
    }

    Ok(copied)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Copy any missing default config files into `base_dir/config`, then load.
pub fn load_config_at(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

/// Convenience wrapper: loads config relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_at(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.seasons.is_empty() {
        return Err(invalid("league.seasons", "must list at least one season"));
    }

    validate_rating(&config.rating, &config.league.seasons)
}

/// Check a rating config against the seasons it will be asked to rate.
pub fn validate_rating(rating: &RatingConfig, seasons: &[Season]) -> Result<(), ConfigError> {
    for season in seasons {
        if !rating.season_weights.contains_key(season) {
            return Err(invalid(
                format!("season_weights.{season}"),
                "every configured season needs a recency weight",
            ));
        }
    }

    for (season, w) in &rating.season_weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(invalid(
                format!("season_weights.{season}"),
                format!("must be a finite value >= 0, got {w}"),
            ));
        }
    }

    if !(rating.games_per_season.is_finite() && rating.games_per_season > 0.0) {
        return Err(invalid(
            "rating.games_per_season",
            format!("must be > 0, got {}", rating.games_per_season),
        ));
    }

    let w = &rating.weights;
    let weight_fields: &[(&str, f64)] = &[
        ("stat_weights.points", w.points),
        ("stat_weights.plus_minus", w.plus_minus),
        ("stat_weights.shg", w.shg),
        ("stat_weights.faceoff", w.faceoff),
        ("stat_weights.blocks", w.blocks),
        ("stat_weights.hits", w.hits),
        ("stat_weights.pim", w.pim),
        ("stat_weights.fights", w.fights),
        ("stat_weights.gp", w.gp),
        ("stat_weights.age", w.age),
        ("stat_weights.fantasy", w.fantasy),
        ("stat_weights.team", w.team),
    ];
    for (name, val) in weight_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(*name, format!("must be a finite value >= 0, got {val}")));
        }
    }

    for (team, m) in &rating.team_multipliers {
        if !m.is_finite() || *m <= 0.0 {
            return Err(invalid(
                format!("team_multipliers.{team}"),
                format!("must be > 0, got {m}"),
            ));
        }
    }

    let curve = &rating.age_curve;
    if ![curve.peak, curve.alpha, curve.min, curve.max]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(invalid("age_curve", "all parameters must be finite"));
    }
    if curve.min > curve.max {
        return Err(invalid(
            "age_curve.min",
            format!("must not exceed max ({} > {})", curve.min, curve.max),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
