//! SQLite connection owner and the transaction manager for imports.

use std::path::Path;

use chrono::NaiveTime;
use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::error::{MeetupError, Result};
use crate::normalize::{ImportReport, Normalizer};
use crate::document::DataTree;
use crate::schema::TableRegistry;

/// Owns the database connection and the table registry.
///
/// All writes go through a transaction: an import or a revision either lands
/// completely or leaves the store as it was.
pub struct Store {
    pub(crate) conn: Connection,
    pub(crate) registry: TableRegistry,
    pub(crate) default_start_time: NaiveTime,
}

impl Store {
    /// Open a throwaway in-memory store.
    pub fn open_in_memory(registry: TableRegistry) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, registry)
    }

    /// Open (or create) a store backed by a file.
    pub fn open(path: impl AsRef<Path>, registry: TableRegistry) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening database");
        Self::init(Connection::open(path)?, registry)
    }

    fn init(conn: Connection, registry: TableRegistry) -> Result<Self> {
        // Deleting an event cascades to its talks and links.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        registry.create_tables(&conn)?;
        Ok(Self {
            conn,
            registry,
            default_start_time: default_start_time(),
        })
    }

    /// Start time given to events declared with a date only.
    pub fn with_default_start_time(mut self, time: NaiveTime) -> Self {
        self.default_start_time = time;
        self
    }

    /// Import a whole document tree in one transaction.
    pub fn import(&mut self, tree: &DataTree) -> Result<ImportReport> {
        let normalizer = Normalizer::new(&self.registry, self.default_start_time);
        let report = atomically(&mut self.conn, |tx| normalizer.normalize(tx, tree))?;
        info!(
            events = report.event_ids.len(),
            inserted = report.stats.total_inserted(),
            deduplicated = report.stats.total_deduplicated(),
            "Imported document tree"
        );
        Ok(report)
    }

    /// Read access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn default_start_time(&self) -> NaiveTime {
        self.default_start_time
    }
}

/// 19:00, the customary meetup start.
pub(crate) fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Run `f` inside a transaction, committing on success and rolling back
/// before the error propagates.
pub(crate) fn atomically<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "Rolling back transaction");
            rollback(tx, err)
        }
    }
}

fn rollback<T>(tx: Transaction<'_>, err: MeetupError) -> Result<T> {
    if let Err(rollback_err) = tx.rollback() {
        warn!(error = %rollback_err, "Rollback failed");
    }
    Err(err)
}
