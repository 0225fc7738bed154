// Engine: owns the loaded data, the derived tables and the annotation store.

use tracing::info;

use crate::annotations::{open_backend, AnnotationError, AnnotationStore, SnapshotBackend};
use crate::bio::{load_roster, BioRegistry, LoadError};
use crate::config::{Config, RatingConfig};
use crate::rating::{self, DerivedTables, RatingContext};
use crate::stats::{PlayerId, Season, StatStore};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// Loaded stat data, bios, roster and annotations. Everything except the
/// annotations is read-only after construction.
pub struct Engine {
    seasons: Vec<Season>,
    rating: RatingConfig,
    store: StatStore,
    bios: BioRegistry,
    roster: Vec<PlayerId>,
    derived: DerivedTables,
    annotations: AnnotationStore,
}

impl Engine {
    /// Load bios, roster, season files and the annotation snapshot from the
    /// configured paths, then run the load-time derivations.
    pub fn load(config: &Config) -> Result<Self, EngineError> {
        let paths = &config.data_paths;
        let bios = BioRegistry::load(&config.resolve(&paths.bios))?;
        let roster = load_roster(&config.resolve(&paths.roster), &bios)?;
        let store = StatStore::load_dir(&config.resolve(&paths.stats_dir), &config.league.seasons);
        let backend = open_backend(&config.resolve(&paths.annotations))?;

        let engine = Self::from_parts(
            config.league.seasons.clone(),
            config.rating.clone(),
            store,
            bios,
            roster,
            backend,
        )?;
        Ok(engine)
    }

    /// Build from already-loaded parts. The roster is filtered to active
    /// players with a bio; seasons are sorted chronologically.
    pub fn from_parts(
        mut seasons: Vec<Season>,
        rating: RatingConfig,
        mut store: StatStore,
        bios: BioRegistry,
        roster: Vec<PlayerId>,
        backend: Box<dyn SnapshotBackend>,
    ) -> Result<Self, AnnotationError> {
        seasons.sort();
        seasons.dedup();
        let roster = bios.filter_active(roster);

        let derived = rating::prepare(&mut store, &bios, &roster, &seasons, &rating);
        let annotations = AnnotationStore::load(backend, &roster)?;

        info!(
            "Engine ready: {} active players across {} seasons",
            roster.len(),
            seasons.len()
        );

        Ok(Self {
            seasons,
            rating,
            store,
            bios,
            roster,
            derived,
            annotations,
        })
    }

    /// Configured seasons, oldest first.
    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    /// Active players in roster order.
    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn store(&self) -> &StatStore {
        &self.store
    }

    pub fn bios(&self) -> &BioRegistry {
        &self.bios
    }

    pub fn derived(&self) -> &DerivedTables {
        &self.derived
    }

    pub fn rating_config(&self) -> &RatingConfig {
        &self.rating
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn rating_context(&self) -> RatingContext<'_> {
        RatingContext::new(&self.store, &self.derived, &self.rating)
    }

    pub fn is_active(&self, player: &PlayerId) -> bool {
        self.roster.contains(player)
    }

    pub fn set_picked(&mut self, player: &PlayerId, picked: bool) -> Result<(), AnnotationError> {
        self.annotations.set_picked(player, picked)
    }

    pub fn set_note(
        &mut self,
        player: &PlayerId,
        note: impl Into<String>,
    ) -> Result<(), AnnotationError> {
        self.annotations.set_note(player, note)
    }

    pub fn save_annotations(&self) -> Result<(), AnnotationError> {
        self.annotations.save()
    }
}
