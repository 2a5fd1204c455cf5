//! Reads a data directory into a [`DataTree`].
//!
//! ```text
//! data/
//! ├── meta.yaml
//! ├── cities/
//! │   ├── brno.yaml
//! │   └── brno/venues/u-dreveneho-orla.yaml
//! └── series/
//!     └── brno-pyvo/
//!         ├── series.yaml
//!         └── events/2013-05-30-python-3.yaml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{MeetupError, Result};

use super::slug::is_slug;
use super::tree::{CityDoc, DataTree, EventDoc, Meta, SeriesDoc, VenueDoc};

const YAML_EXTENSION: &str = "yaml";

/// Load the whole data directory rooted at `root`.
pub fn load_tree(root: impl AsRef<Path>) -> Result<DataTree> {
    let root = root.as_ref();
    let meta: Meta = read_yaml(&root.join("meta.yaml"))?;

    let mut tree = DataTree::new();
    tree.meta = meta;

    let cities_dir = root.join("cities");
    for path in yaml_files(&cities_dir, 1)? {
        let slug = file_slug(&path)?;
        let mut city: CityDoc = read_yaml(&path)?;
        city.source = Some(path.clone());

        let venues_dir = cities_dir.join(&slug).join("venues");
        for venue_path in yaml_files(&venues_dir, 1)? {
            let venue: VenueDoc = read_yaml(&venue_path)?;
            city.venues.insert(file_slug(&venue_path)?, venue);
        }
        tree.cities.insert(slug, city);
    }

    let series_dir = root.join("series");
    for dir in subdirectories(&series_dir)? {
        let slug = file_slug(&dir)?;
        let mut series: SeriesDoc = read_yaml(&dir.join("series.yaml"))?;

        for event_path in yaml_files(&dir.join("events"), usize::MAX)? {
            let mut event: EventDoc = read_yaml(&event_path)?;
            event.source = Some(event_path);
            series.events.push(event);
        }
        debug!(series = %slug, events = series.events.len(), "Loaded series");
        tree.series.insert(slug, series);
    }

    Ok(tree)
}

/// Parse one YAML document.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| MeetupError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| MeetupError::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// YAML files under `dir` up to `max_depth`, sorted by path. A missing
/// directory has no files.
fn yaml_files(dir: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == YAML_EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Immediate, non-hidden subdirectories of `dir`, sorted by name.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

fn walk_error(dir: &Path, err: walkdir::Error) -> MeetupError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    match err.into_io_error() {
        Some(io) => MeetupError::io(path, io),
        None => MeetupError::Document {
            path,
            message: "filesystem loop".to_string(),
        },
    }
}

/// The slug a file or directory name stands for.
fn file_slug(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if !is_slug(stem) {
        return Err(MeetupError::InvalidSlug(path.display().to_string()));
    }
    Ok(stem.to_string())
}
