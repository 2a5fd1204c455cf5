//! Two-phase replacement and removal of single events.
//!
//! [`Store::stage_replace`] deletes the old event and loads the new one
//! inside an open transaction, returning a [`StagedChange`]. Nothing is
//! visible, and no file is touched, until [`StagedChange::commit`].
//! Dropping or discarding the staged change rolls everything back.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rusqlite::Transaction;
use tracing::{debug, info, warn};

use crate::document::{DataTree, EventDoc};
use crate::error::{MeetupError, Result};
use crate::normalize::Normalizer;
use crate::record::{event_destination, EventRecord};
use crate::store::Store;

use super::diff::unified_diff;

/// Sub-step of staging a revision, named in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SanityCheck,
    RollingBack,
    DeletingPrevious,
    AddingNew,
    Serializing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::SanityCheck => "doing sanity check",
            Phase::RollingBack => "rolling back transaction",
            Phase::DeletingPrevious => "deleting previous entry",
            Phase::AddingNew => "adding new entry",
            Phase::Serializing => "serializing new entry",
        })
    }
}

impl Phase {
    fn wrap(self, source: MeetupError) -> MeetupError {
        MeetupError::Revision {
            phase: self,
            source: Box::new(source),
        }
    }
}

/// A replacement loaded into an open transaction, awaiting confirmation.
pub struct StagedChange<'s> {
    tx: Transaction<'s>,
    data_root: PathBuf,
    event_id: i64,
    previous_yaml: String,
    previous_source: Option<PathBuf>,
    new_yaml: String,
    destination: PathBuf,
}

/// What a committed replacement did on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Id of the new event.
    pub event_id: i64,
    /// File the new entry was written to.
    pub written: PathBuf,
    /// Previous source file, if it was deleted.
    pub removed: Option<PathBuf>,
    /// Previous source file left alone because it is outside the data root.
    pub refused: Option<PathBuf>,
}

/// What a removal did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub event_id: i64,
    pub removed: Option<PathBuf>,
    pub refused: Option<PathBuf>,
}

impl StagedChange<'_> {
    /// Id the new event got.
    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    /// The new entry as it will be written.
    pub fn preview(&self) -> &str {
        &self.new_yaml
    }

    /// The previous entry, serialized the same way.
    pub fn previous(&self) -> &str {
        &self.previous_yaml
    }

    pub fn previous_source(&self) -> Option<&Path> {
        self.previous_source.as_deref()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Unified diff from the previous entry to the new one, with paths
    /// relative to the data root. Empty if nothing changed.
    pub fn diff(&self) -> String {
        let old_name = self
            .previous_source
            .as_deref()
            .map(|p| relative_name(p, &self.data_root))
            .unwrap_or_else(|| relative_name(&self.destination, &self.data_root));
        let new_name = relative_name(&self.destination, &self.data_root);
        unified_diff(&self.previous_yaml, &self.new_yaml, &old_name, &new_name)
    }

    /// Commit the transaction, then swap the files: write the new entry to
    /// its destination and delete the previous source (only if it lies
    /// inside the data root and is a different file).
    pub fn commit(self) -> Result<CommitOutcome> {
        self.tx.commit()?;
        info!(event = self.event_id, path = %self.destination.display(), "Committed replacement");

        if let Some(dir) = self.destination.parent() {
            fs::create_dir_all(dir).map_err(|e| MeetupError::io(dir, e))?;
        }
        fs::write(&self.destination, &self.new_yaml).map_err(|e| MeetupError::io(&self.destination, e))?;

        let (removed, refused) = match &self.previous_source {
            Some(source) if !same_path(source, &self.destination) => remove_source_file(source, &self.data_root)?,
            _ => (None, None),
        };

        Ok(CommitOutcome {
            event_id: self.event_id,
            written: self.destination,
            removed,
            refused,
        })
    }

    /// Abandon the change. The store is left as before staging.
    pub fn discard(self) -> Result<()> {
        debug!(event = self.event_id, "Discarding staged change");
        self.tx.rollback()?;
        Ok(())
    }
}

impl Store {
    /// Stage the replacement of event `event_id` with the entry in
    /// `new_entry` (YAML text).
    ///
    /// The new event stays in the old one's series. On error the
    /// transaction is rolled back and the error names the failing phase.
    pub fn stage_replace(
        &mut self,
        event_id: i64,
        new_entry: &str,
        data_root: &Path,
    ) -> Result<StagedChange<'_>> {
        let previous = EventRecord::load(&self.conn, event_id).map_err(|e| Phase::SanityCheck.wrap(e))?;
        let previous_yaml = previous.to_yaml().map_err(|e| Phase::SanityCheck.wrap(e))?;

        if !self.conn.is_autocommit() {
            warn!("Rolling back a transaction left open");
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| Phase::RollingBack.wrap(e.into()))?;
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| Phase::RollingBack.wrap(e.into()))?;

        delete_event(&tx, event_id).map_err(|e| Phase::DeletingPrevious.wrap(e))?;

        let mut event: EventDoc =
            serde_yaml::from_str(new_entry).map_err(|e| Phase::AddingNew.wrap(e.into()))?;
        let destination = event_destination(data_root, &previous.series, &event);
        event.source = Some(destination.clone());
        let tree = DataTree::single_event(previous.series.clone(), event);
        let report = Normalizer::new(&self.registry, self.default_start_time)
            .normalize(&tx, &tree)
            .map_err(|e| Phase::AddingNew.wrap(e))?;

        let new_id = report.event_ids.first().copied().ok_or_else(|| {
            Phase::AddingNew.wrap(MeetupError::NotFound("No event in new entry".to_string()))
        })?;
        let new_yaml = EventRecord::load(&tx, new_id)
            .and_then(|record| record.to_yaml())
            .map_err(|e| Phase::Serializing.wrap(e))?;

        debug!(previous = event_id, new = new_id, "Staged replacement");
        Ok(StagedChange {
            tx,
            data_root: data_root.to_path_buf(),
            event_id: new_id,
            previous_yaml,
            previous_source: previous.source,
            new_yaml,
            destination,
        })
    }

    /// Stage and immediately commit a replacement.
    pub fn replace_event(&mut self, event_id: i64, new_entry: &str, data_root: &Path) -> Result<CommitOutcome> {
        self.stage_replace(event_id, new_entry, data_root)?.commit()
    }

    /// Delete event `event_id` (with its talks and links) and its source
    /// file, if that file lies inside `data_root`.
    pub fn remove_event(&mut self, event_id: i64, data_root: &Path) -> Result<RemoveOutcome> {
        let previous = EventRecord::load(&self.conn, event_id)?;

        let tx = self.conn.transaction()?;
        delete_event(&tx, event_id).map_err(|e| Phase::DeletingPrevious.wrap(e))?;
        tx.commit()?;
        info!(event = event_id, "Removed event");

        let (removed, refused) = match &previous.source {
            Some(source) => remove_source_file(source, data_root)?,
            None => (None, None),
        };
        Ok(RemoveOutcome {
            event_id,
            removed,
            refused,
        })
    }
}

fn delete_event(tx: &Transaction<'_>, event_id: i64) -> Result<()> {
    let deleted = tx.execute("DELETE FROM events WHERE id = ?1", [event_id])?;
    if deleted == 0 {
        return Err(MeetupError::NotFound("No such meetup".to_string()));
    }
    Ok(())
}

/// Delete `path` if it lies inside `root`. Returns `(removed, refused)`.
fn remove_source_file(path: &Path, root: &Path) -> Result<(Option<PathBuf>, Option<PathBuf>)> {
    if !is_inside_root(path, root) {
        warn!(path = %path.display(), root = %root.display(), "Refusing to delete file outside the data root");
        return Ok((None, Some(path.to_path_buf())));
    }
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Deleted source file");
            Ok((Some(path.to_path_buf()), None))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((None, None)),
        Err(e) => Err(MeetupError::io(path, e)),
    }
}

/// Whether `path` lies strictly below `root`, judged on the paths alone.
pub fn is_inside_root(path: &Path, root: &Path) -> bool {
    let (Ok(path), Ok(root)) = (std::path::absolute(path), std::path::absolute(root)) else {
        return false;
    };
    if path.components().any(|c| c == Component::ParentDir) {
        return false;
    }
    match path.strip_prefix(&root) {
        Ok(rest) => rest.components().next().is_some(),
        Err(_) => false,
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a.components().eq(b.components()),
        _ => a == b,
    }
}

fn relative_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::DeletingPrevious.to_string(), "deleting previous entry");
        let err = Phase::AddingNew.wrap(MeetupError::InvalidSlug("X".into()));
        assert_eq!(err.to_string(), "Error adding new entry: Invalid slug 'X'");
    }

    #[test]
    fn test_is_inside_root() {
        let root = Path::new("/data");
        assert!(is_inside_root(Path::new("/data/series/a/events/x.yaml"), root));
        assert!(!is_inside_root(Path::new("/data"), root));
        assert!(!is_inside_root(Path::new("/etc/passwd"), root));
        assert!(!is_inside_root(Path::new("/data/../etc/passwd"), root));
        assert!(!is_inside_root(Path::new("/database/x.yaml"), root));
    }

    #[test]
    fn test_relative_root() {
        assert!(is_inside_root(Path::new("./series/x.yaml"), Path::new(".")));
        assert!(is_inside_root(Path::new("series/x.yaml"), Path::new(".")));
    }

    #[test]
    fn test_same_path() {
        assert!(same_path(Path::new("/data/./series/x.yaml"), Path::new("/data/series/x.yaml")));
        assert!(!same_path(Path::new("/data/series/x.yaml"), Path::new("/data/series/y.yaml")));
    }

    #[test]
    fn test_remove_source_file_outside_root() {
        let root = tempfile::TempDir::new().unwrap();
        let outside = tempfile::NamedTempFile::new().unwrap();
        let (removed, refused) = remove_source_file(outside.path(), root.path()).unwrap();
        assert!(removed.is_none());
        assert_eq!(refused.as_deref(), Some(outside.path()));
        assert!(outside.path().exists());
    }
}
