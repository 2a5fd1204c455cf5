//! Main MeetupDb struct and public API.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::document::{load_tree, DataTree};
use crate::error::Result;
use crate::normalize::ImportReport;
use crate::record::{find_event, EventRecord};
use crate::revision::{CommitOutcome, EditSession, RemoveOutcome};
use crate::schema::{TableKind, TableRegistry};
use crate::store::Store;

/// Configuration for a meetup database.
#[derive(Debug, Clone)]
pub struct MeetupConfig {
    /// Root of the data directory. Files outside it are never deleted.
    pub data_dir: PathBuf,
    /// SQLite file to keep the store in (None = in memory).
    pub database: Option<PathBuf>,
    /// Start time of events declared with a date only.
    pub default_start_time: NaiveTime,
    /// Per-table overrides of the columns ignored when comparing duplicates.
    pub ignored_columns: Vec<(TableKind, Vec<String>)>,
    /// Pinned current moment (None = the system clock).
    pub now: Option<NaiveDateTime>,
}

impl Default for MeetupConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database: None,
            default_start_time: crate::store::default_start_time(),
            ignored_columns: Vec::new(),
            now: None,
        }
    }
}

impl MeetupConfig {
    /// Default configuration for the data directory at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    pub fn with_default_start_time(mut self, time: NaiveTime) -> Self {
        self.default_start_time = time;
        self
    }

    /// Replace the ignored columns of one table.
    pub fn with_ignored_columns<I, S>(mut self, kind: TableKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_columns
            .push((kind, columns.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// The table registry with this configuration's overrides applied.
    pub fn registry(&self) -> TableRegistry {
        self.ignored_columns
            .iter()
            .fold(TableRegistry::new(), |registry, (kind, columns)| {
                registry.with_ignored_columns(*kind, columns.iter().cloned())
            })
    }
}

/// A loaded meetup database.
pub struct MeetupDb {
    config: MeetupConfig,
    store: Store,
    import: ImportReport,
}

impl MeetupDb {
    /// Load the data directory named by `config`.
    pub fn open(config: MeetupConfig) -> Result<Self> {
        debug!(data_dir = %config.data_dir.display(), "Loading data directory");
        let tree = load_tree(&config.data_dir)?;
        Self::from_tree(config, &tree)
    }

    /// Build a database from an already-loaded tree.
    pub fn from_tree(config: MeetupConfig, tree: &DataTree) -> Result<Self> {
        let registry = config.registry();
        let store = match &config.database {
            Some(path) => Store::open(path, registry)?,
            None => Store::open_in_memory(registry)?,
        }
        .with_default_start_time(config.default_start_time);

        let mut db = Self {
            config,
            store,
            import: ImportReport::default(),
        };
        db.import = db.store.import(tree)?;
        Ok(db)
    }

    pub fn config(&self) -> &MeetupConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Report of the import that built this database.
    pub fn import_report(&self) -> &ImportReport {
        &self.import
    }

    /// The current moment, pinned or from the system clock.
    pub fn now(&self) -> NaiveDateTime {
        self.config.now.unwrap_or_else(|| Local::now().naive_local())
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Find one event of a city by date expression.
    pub fn find_event(&self, city: &str, date: &str, today: NaiveDate) -> Result<i64> {
        find_event(self.store.connection(), city, date, today)
    }

    /// Load a stored event.
    pub fn event(&self, id: i64) -> Result<EventRecord> {
        EventRecord::load(self.store.connection(), id)
    }

    /// Start an interactive edit of event `id`.
    pub fn edit_session(&mut self, id: i64) -> Result<EditSession<'_>> {
        EditSession::new(&mut self.store, id, &self.config.data_dir)
    }

    /// Replace event `id` with `new_entry` (YAML) without confirmation.
    pub fn replace_event(&mut self, id: i64, new_entry: &str) -> Result<CommitOutcome> {
        self.store.replace_event(id, new_entry, &self.config.data_dir)
    }

    /// Remove event `id` and its source file.
    pub fn remove_event(&mut self, id: i64) -> Result<RemoveOutcome> {
        self.store.remove_event(id, &self.config.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MeetupConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert!(config.database.is_none());
        assert_eq!(config.default_start_time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());
    }

    #[test]
    fn test_config_registry_overrides() {
        let config = MeetupConfig::new("data").with_ignored_columns(TableKind::Venue, Vec::<String>::new());
        assert!(config.registry().get(TableKind::Venue).is_compared("address"));
        assert!(!MeetupConfig::default().registry().get(TableKind::Venue).is_compared("address"));
    }

    #[test]
    fn test_pinned_now() {
        let now = NaiveDate::from_ymd_opt(2014, 8, 7)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let db = MeetupDb::from_tree(MeetupConfig::default().with_now(now), &DataTree::new()).unwrap();
        assert_eq!(db.today(), now.date());
        assert!(db.import_report().is_noop());
    }
}
