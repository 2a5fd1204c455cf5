//! The document tree: the whole data directory as nested, already-parsed
//! documents.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::start::EventStart;

/// The only document schema version this build accepts.
pub const SCHEMA_VERSION: u32 = 1;

/// Root of a document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTree {
    /// Metadata about the data set.
    pub meta: Meta,
    /// Cities keyed by slug.
    #[serde(default)]
    pub cities: IndexMap<String, CityDoc>,
    /// Series keyed by slug.
    #[serde(default)]
    pub series: IndexMap<String, SeriesDoc>,
}

impl DataTree {
    /// An empty tree at the current schema version.
    pub fn new() -> Self {
        Self {
            meta: Meta {
                version: SCHEMA_VERSION,
            },
            cities: IndexMap::new(),
            series: IndexMap::new(),
        }
    }

    /// A tree holding exactly one event of an existing series.
    ///
    /// Cities, venues and the series itself are expected to be in the store
    /// already.
    pub fn single_event(series_slug: impl Into<String>, event: EventDoc) -> Self {
        let mut tree = Self::new();
        tree.series.insert(
            series_slug.into(),
            SeriesDoc {
                name: None,
                city: None,
                recurrence: None,
                events: vec![event],
            },
        );
        tree
    }

    /// All events of the tree, in document order, with their series slug.
    pub fn events(&self) -> impl Iterator<Item = (&str, &EventDoc)> {
        self.series
            .iter()
            .flat_map(|(slug, series)| series.events.iter().map(move |e| (slug.as_str(), e)))
    }
}

impl Default for DataTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Contents of `meta.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub version: u32,
}

/// A city that holds events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Venues keyed by slug.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub venues: IndexMap<String, VenueDoc>,
    /// File the city was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// A venue to hold events in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub location: Location,
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A series of recurring events.
///
/// `name` is only optional so that single-event trees can refer to a
/// series already in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Slug of the home city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub events: Vec<EventDoc>,
}

/// Expected future occurrence pattern of a series. Stored, not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One event.
///
/// Field order is the serialization order of an event file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventDoc {
    /// Slug of the city.
    pub city: String,
    pub start: EventStart,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Slug of the venue within the event's city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default)]
    pub talks: Vec<TalkDoc>,
    #[serde(default)]
    pub urls: Vec<String>,
    /// File the event was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// One talk of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TalkDoc {
    pub title: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lightning: bool,
    #[serde(default)]
    pub speakers: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    /// Supporting material, each entry a `{kind: url}` mapping.
    #[serde(default)]
    pub coverage: Vec<IndexMap<LinkKind, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of a talk link. `Talk` points at the talk itself; the rest is
/// supporting material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Slides,
    Video,
    Link,
    Writeup,
    Notes,
    Talk,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Slides => "slides",
            LinkKind::Video => "video",
            LinkKind::Link => "link",
            LinkKind::Writeup => "writeup",
            LinkKind::Notes => "notes",
            LinkKind::Talk => "talk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "slides" => Some(LinkKind::Slides),
            "video" => Some(LinkKind::Video),
            "link" => Some(LinkKind::Link),
            "writeup" => Some(LinkKind::Writeup),
            "notes" => Some(LinkKind::Notes),
            "talk" => Some(LinkKind::Talk),
            _ => None,
        }
    }
}
