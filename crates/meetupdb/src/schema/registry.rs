//! Table registry: the relational schema and per-table key rules.

use indexmap::IndexMap;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// The tables of the store, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    City,
    Venue,
    Series,
    Speaker,
    Event,
    EventLink,
    Talk,
    TalkSpeaker,
    TalkLink,
}

impl TableKind {
    /// All kinds, parents before children.
    pub const ALL: [TableKind; 9] = [
        TableKind::City,
        TableKind::Venue,
        TableKind::Series,
        TableKind::Speaker,
        TableKind::Event,
        TableKind::EventLink,
        TableKind::Talk,
        TableKind::TalkSpeaker,
        TableKind::TalkLink,
    ];

    /// SQL table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            TableKind::City => "cities",
            TableKind::Venue => "venues",
            TableKind::Series => "series",
            TableKind::Speaker => "speakers",
            TableKind::Event => "events",
            TableKind::EventLink => "event_links",
            TableKind::Talk => "talks",
            TableKind::TalkSpeaker => "talk_speakers",
            TableKind::TalkLink => "talk_links",
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Column recording the file a row was loaded from. It says where a row
/// came from, not what it is, so it never takes part in duplicate
/// comparison.
pub const PROVENANCE_COLUMN: &str = "_source";

/// Key rules for one table.
#[derive(Debug, Clone)]
pub struct TableDef {
    pub kind: TableKind,
    /// Whether rows get a surrogate `id`.
    pub has_id: bool,
    /// Columns forming the natural key.
    pub natural_key: &'static [&'static str],
    /// Columns left out of duplicate comparison.
    pub ignored_columns: Vec<String>,
}

impl TableDef {
    fn new(kind: TableKind, has_id: bool, natural_key: &'static [&'static str]) -> Self {
        Self {
            kind,
            has_id,
            natural_key,
            ignored_columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.table_name()
    }

    /// Whether `column` takes part in duplicate comparison.
    pub fn is_compared(&self, column: &str) -> bool {
        column != "id" && column != PROVENANCE_COLUMN && !self.ignored_columns.iter().any(|c| c == column)
    }
}

/// The schema of the store, constructed once and shared by reference.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    tables: IndexMap<TableKind, TableDef>,
}

impl TableRegistry {
    /// The standard schema.
    ///
    /// Venue addresses come from an upstream import that is known to be
    /// unreliable, so they are ignored when comparing duplicate venues.
    pub fn new() -> Self {
        let defs = [
            TableDef::new(TableKind::City, true, &["slug"]),
            TableDef::new(TableKind::Venue, true, &["city_id", "slug"]),
            TableDef::new(TableKind::Series, true, &["slug"]),
            TableDef::new(TableKind::Speaker, true, &["name"]),
            TableDef::new(TableKind::Event, true, &["city_id", "date", "start_time"]),
            TableDef::new(TableKind::EventLink, false, &["event_id", "url"]),
            TableDef::new(TableKind::Talk, true, &["event_id", "index"]),
            TableDef::new(TableKind::TalkSpeaker, false, &["talk_id", "speaker_id"]),
            TableDef::new(TableKind::TalkLink, false, &["talk_id", "url"]),
        ];
        let tables = defs.into_iter().map(|d| (d.kind, d)).collect();
        Self { tables }.with_ignored_columns(TableKind::Venue, ["address"])
    }

    /// Replace the ignored columns of one table.
    pub fn with_ignored_columns<I, S>(mut self, kind: TableKind, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(def) = self.tables.get_mut(&kind) {
            def.ignored_columns = columns.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Definition of a table.
    pub fn get(&self, kind: TableKind) -> &TableDef {
        // Every kind is registered in `new`.
        &self.tables[&kind]
    }

    /// All table definitions, parents before children.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    /// Create every table on a fresh connection.
    pub fn create_tables(&self, conn: &Connection) -> Result<()> {
        debug!(tables = self.tables.len(), "Creating tables");
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cities (
    id INTEGER PRIMARY KEY NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    _source TEXT
);

CREATE TABLE IF NOT EXISTS venues (
    id INTEGER PRIMARY KEY NOT NULL,
    city_id INTEGER NOT NULL REFERENCES cities(id),
    slug TEXT NOT NULL,
    name TEXT NOT NULL,
    address TEXT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    UNIQUE (city_id, slug)
);

CREATE TABLE IF NOT EXISTS series (
    id INTEGER PRIMARY KEY NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    home_city_id INTEGER REFERENCES cities(id),
    recurrence_rule TEXT,
    recurrence_description TEXT
);

CREATE TABLE IF NOT EXISTS speakers (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY NOT NULL,
    series_id INTEGER NOT NULL REFERENCES series(id),
    city_id INTEGER NOT NULL REFERENCES cities(id),
    venue_id INTEGER REFERENCES venues(id),
    name TEXT NOT NULL,
    number INTEGER,
    topic TEXT,
    description TEXT,
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    _source TEXT,
    UNIQUE (city_id, date, start_time)
);

CREATE INDEX IF NOT EXISTS idx_events_city_date ON events(city_id, date);

CREATE TABLE IF NOT EXISTS event_links (
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    "index" INTEGER NOT NULL,
    PRIMARY KEY (event_id, url)
);

CREATE TABLE IF NOT EXISTS talks (
    id INTEGER PRIMARY KEY NOT NULL,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    "index" INTEGER NOT NULL,
    title TEXT NOT NULL,
    is_lightning INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    UNIQUE (event_id, "index")
);

CREATE TABLE IF NOT EXISTS talk_speakers (
    talk_id INTEGER NOT NULL REFERENCES talks(id) ON DELETE CASCADE,
    speaker_id INTEGER NOT NULL REFERENCES speakers(id),
    "index" INTEGER NOT NULL,
    PRIMARY KEY (talk_id, speaker_id)
);

CREATE TABLE IF NOT EXISTS talk_links (
    talk_id INTEGER NOT NULL REFERENCES talks(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    "index" INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('slides', 'video', 'link', 'writeup', 'notes', 'talk')),
    PRIMARY KEY (talk_id, url)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_matches_kinds() {
        let registry = TableRegistry::new();
        let kinds: Vec<TableKind> = registry.tables().map(|d| d.kind).collect();
        assert_eq!(kinds, TableKind::ALL);
    }

    #[test]
    fn test_venue_address_ignored_by_default() {
        let registry = TableRegistry::new();
        let venue = registry.get(TableKind::Venue);
        assert!(!venue.is_compared("address"));
        assert!(venue.is_compared("latitude"));
        assert!(!venue.is_compared("id"));
    }

    #[test]
    fn test_provenance_never_compared() {
        let registry = TableRegistry::new().with_ignored_columns(TableKind::City, Vec::<String>::new());
        assert!(!registry.get(TableKind::City).is_compared(PROVENANCE_COLUMN));
        assert!(!registry.get(TableKind::Event).is_compared(PROVENANCE_COLUMN));
        assert!(registry.get(TableKind::Event).is_compared("name"));
    }

    #[test]
    fn test_override_ignored_columns() {
        let registry = TableRegistry::new()
            .with_ignored_columns(TableKind::Venue, Vec::<String>::new())
            .with_ignored_columns(TableKind::City, ["latitude", "longitude"]);
        assert!(registry.get(TableKind::Venue).is_compared("address"));
        assert!(!registry.get(TableKind::City).is_compared("longitude"));
    }

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = TableRegistry::new();
        registry.create_tables(&conn).unwrap();
        for def in registry.tables() {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [def.name()],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", def.name());
        }
    }
}
