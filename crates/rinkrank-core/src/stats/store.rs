// Season stat store: ingestion of season-tagged category files.
//
// Expects a directory of `<season>_<tag>.json` files, each an object of
// `player_id -> { field: value }`. Only the `full` and `ratios` tags are
// read; `norms` is derived later by the normalization pass.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use super::records::{FullRecord, NormRecord, RatioRecord, RawRecord, RecordError};
use super::season::parse_season_file_name;
use super::{PlayerId, Season};

/// Player id -> record, for one season of one category.
pub type SeasonTable<R> = HashMap<PlayerId, R>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
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
// Category tags
// ---------------------------------------------------------------------------

/// Category tags the store ingests from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Full,
    Ratios,
}

impl Category {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "full" => Some(Category::Full),
            "ratios" => Some(Category::Ratios),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Category::Full => "full",
            Category::Ratios => "ratios",
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Per-season, per-category player records.
#[derive(Debug, Clone, Default)]
pub struct StatStore {
    full: BTreeMap<Season, SeasonTable<FullRecord>>,
    ratios: BTreeMap<Season, SeasonTable<RatioRecord>>,
    norms: BTreeMap<Season, SeasonTable<NormRecord>>,
}

impl StatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured season's `full` and `ratios` files from `dir`.
    ///
    /// Never fails as a whole: an unreadable directory, a missing file or an
    /// unparsable file leaves that slot empty and logs a warning.
    pub fn load_dir(dir: &Path, seasons: &[Season]) -> Self {
        let mut store = Self::new();

        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    let Some((season, tag)) = parse_season_file_name(name) else {
                        continue;
                    };
                    if !seasons.contains(&season) {
                        debug!("skipping {name}: season {season} not configured");
                        continue;
                    }
                    match Category::from_tag(&tag) {
                        Some(category) => store.load_slot(&path, season, category),
                        None => debug!("skipping {name}: unused category tag `{tag}`"),
                    }
                }
            }
            Err(e) => warn!("failed to read stats directory {}: {e}", dir.display()),
        }

        for season in seasons {
            for category in [Category::Full, Category::Ratios] {
                if !store.has_slot(season, category) {
                    warn!(
                        "{}/{season}_{}.json not found, using an empty table",
                        dir.display(),
                        category.tag()
                    );
                    store.insert_empty(season.clone(), category);
                }
            }
        }

        info!(
            "Loaded stats for {} seasons ({} full records, {} ratio records)",
            seasons.len(),
            store.full.values().map(HashMap::len).sum::<usize>(),
            store.ratios.values().map(HashMap::len).sum::<usize>(),
        );
        store
    }

    fn load_slot(&mut self, path: &Path, season: Season, category: Category) {
        match category {
            Category::Full => {
                let table = load_table_or_empty(path, FullRecord::from_raw);
                self.full.insert(season, table);
            }
            Category::Ratios => {
                let table = load_table_or_empty(path, RatioRecord::from_raw);
                self.ratios.insert(season, table);
            }
        }
    }

    fn has_slot(&self, season: &Season, category: Category) -> bool {
        match category {
            Category::Full => self.full.contains_key(season),
            Category::Ratios => self.ratios.contains_key(season),
        }
    }

    fn insert_empty(&mut self, season: Season, category: Category) {
        match category {
            Category::Full => {
                self.full.insert(season, HashMap::new());
            }
            Category::Ratios => {
                self.ratios.insert(season, HashMap::new());
            }
        }
    }

    /// Replace one season's `full` table with a resident table.
    pub fn insert_full_table(&mut self, season: Season, table: SeasonTable<FullRecord>) {
        self.full.insert(season, table);
    }

    /// Replace one season's `ratios` table with a resident table.
    pub fn insert_ratio_table(&mut self, season: Season, table: SeasonTable<RatioRecord>) {
        self.ratios.insert(season, table);
    }

    pub(crate) fn set_norms(&mut self, season: Season, table: SeasonTable<NormRecord>) {
        self.norms.insert(season, table);
    }

    pub fn full(&self, season: &Season, player: &PlayerId) -> Option<&FullRecord> {
        self.full.get(season)?.get(player)
    }

    pub fn ratio(&self, season: &Season, player: &PlayerId) -> Option<&RatioRecord> {
        self.ratios.get(season)?.get(player)
    }

    pub fn norm(&self, season: &Season, player: &PlayerId) -> Option<&NormRecord> {
        self.norms.get(season)?.get(player)
    }

    pub(crate) fn ratio_mut(&mut self, season: &Season, player: &PlayerId) -> Option<&mut RatioRecord> {
        self.ratios.get_mut(season)?.get_mut(player)
    }

    /// Number of players in a season's `full` table (0 when the slot is empty
    /// or the season is unknown).
    pub fn full_len(&self, season: &Season) -> usize {
        self.full.get(season).map_or(0, HashMap::len)
    }

    pub fn ratios_len(&self, season: &Season) -> usize {
        self.ratios.get(season).map_or(0, HashMap::len)
    }
}

// ---------------------------------------------------------------------------
// Table loaders
// ---------------------------------------------------------------------------

fn load_table_or_empty<R>(
    path: &Path,
    convert: fn(&RawRecord) -> Result<R, RecordError>,
) -> SeasonTable<R> {
    match load_table(path, convert) {
        Ok(table) => table,
        Err(e) => {
            warn!("{e}; using an empty table");
            HashMap::new()
        }
    }
}

/// Load one season/category file into a typed table.
pub fn load_table<R>(
    path: &Path,
    convert: fn(&RawRecord) -> Result<R, RecordError>,
) -> Result<SeasonTable<R>, StoreError> {
    let file = std::fs::File::open(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_table_from_reader(file, convert).map_err(|e| StoreError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

/// Parse a season table from any reader. Records that fail conversion are
/// skipped individually.
fn load_table_from_reader<R, T: Read>(
    rdr: T,
    convert: fn(&RawRecord) -> Result<R, RecordError>,
) -> Result<SeasonTable<R>, serde_json::Error> {
    let raw: HashMap<String, RawRecord> = serde_json::from_reader(rdr)?;
    let mut table = HashMap::with_capacity(raw.len());
    for (id, record) in raw {
        match convert(&record) {
            Ok(rec) => {
                table.insert(PlayerId::new(id), rec);
            }
            Err(e) => warn!("skipping record for player {id}: {e}"),
        }
    }
    Ok(table)
}
