//! Integration tests for loading data directories into the store.

mod common;

use chrono::NaiveTime;
use tempfile::TempDir;

use common::{count, create_test_data, test_config, write_file, BRNO_2013, BRNO_2014};
use meetupdb::document::read_yaml;
use meetupdb::{load_tree, EventDoc, MeetupDb, MeetupError, Store, TableKind, TableRegistry};

// =============================================================================
// Import Tests
// =============================================================================

#[test]
fn test_import_data_directory() {
    let data = create_test_data();
    let db = MeetupDb::open(test_config(data.path())).unwrap();
    let report = db.import_report();

    assert_eq!(report.event_ids, [0, 1, 2, 3]);
    assert_eq!(report.table(TableKind::City).inserted, 2);
    assert_eq!(report.table(TableKind::Venue).inserted, 2);
    assert_eq!(report.table(TableKind::Series).inserted, 2);
    assert_eq!(report.table(TableKind::Speaker).inserted, 3);
    assert_eq!(report.table(TableKind::Talk).inserted, 5);
    assert_eq!(report.table(TableKind::TalkLink).inserted, 4);
    assert_eq!(report.table(TableKind::EventLink).inserted, 1);

    let conn = db.store().connection();
    assert_eq!(count(conn, "events"), 4);
    assert_eq!(count(conn, "talk_speakers"), 6);
}

#[test]
fn test_default_start_time() {
    let data = create_test_data();
    let db = MeetupDb::open(test_config(data.path())).unwrap();

    let id = db.find_event("brno", "2014-09", db.today()).unwrap();
    let event = db.event(id).unwrap();
    assert_eq!(event.start_time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());

    let id = db.find_event("ostrava", "13-12", db.today()).unwrap();
    assert_eq!(db.event(id).unwrap().start_time.to_string(), "18:00:00");
}

#[test]
fn test_configured_default_start_time() {
    let data = create_test_data();
    let config = test_config(data.path()).with_default_start_time(NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    let db = MeetupDb::open(config).unwrap();

    let id = db.find_event("brno", "2014-09-25", db.today()).unwrap();
    assert_eq!(db.event(id).unwrap().start_time.to_string(), "18:30:00");
}

#[test]
fn test_provenance_recorded() {
    let data = create_test_data();
    let db = MeetupDb::open(test_config(data.path())).unwrap();

    let event = db.event(0).unwrap();
    assert_eq!(event.source, Some(data.path().join(BRNO_2013)));
}

// =============================================================================
// Idempotence and Conflicts
// =============================================================================

#[test]
fn test_reimport_is_idempotent() {
    let data = create_test_data();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("meetups.sqlite");

    let first = MeetupDb::open(test_config(data.path()).with_database(&db_path)).unwrap();
    let first_ids = first.import_report().event_ids.clone();
    let first_event = first.event(0).unwrap();
    drop(first);

    let second = MeetupDb::open(test_config(data.path()).with_database(&db_path)).unwrap();
    let report = second.import_report();
    assert!(report.is_noop());
    assert_eq!(report.event_ids, first_ids);
    assert_eq!(report.table(TableKind::Event).deduplicated, 4);
    assert_eq!(count(second.store().connection(), "events"), 4);
    assert_eq!(count(second.store().connection(), "talks"), 5);
    assert_eq!(second.event(0).unwrap(), first_event);
}

#[test]
fn test_reimport_with_root_spelled_differently() {
    let data = create_test_data();
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("meetups.sqlite");

    drop(MeetupDb::open(test_config(data.path()).with_database(&db_path)).unwrap());

    // Same files, so the recorded source paths differ only in spelling
    let db = MeetupDb::open(test_config(&data.path().join(".")).with_database(&db_path)).unwrap();
    assert!(db.import_report().is_noop());
    assert_eq!(db.import_report().table(TableKind::Event).deduplicated, 4);
}

#[test]
fn test_reimport_with_new_event_adds_only_it() {
    let data = create_test_data();
    let mut store = Store::open_in_memory(TableRegistry::new()).unwrap();
    store.import(&load_tree(data.path()).unwrap()).unwrap();

    write_file(
        data.path(),
        "series/brno-pyvo/events/2014-10-30.yaml",
        "city: brno\nstart: 2014-10-30\nname: Brněnské Pyvo\n",
    );
    let report = store.import(&load_tree(data.path()).unwrap()).unwrap();
    assert_eq!(report.table(TableKind::Event).inserted, 1);
    assert_eq!(report.table(TableKind::Event).deduplicated, 4);
    // New ids continue after the stored ones
    assert!(report.event_ids.contains(&4));
}

#[test]
fn test_conflicting_reimport() {
    let data = create_test_data();
    let mut store = Store::open_in_memory(TableRegistry::new()).unwrap();
    store.import(&load_tree(data.path()).unwrap()).unwrap();

    write_file(data.path(), "cities/brno.yaml", "name: Brünn\nlatitude: 49.19\nlongitude: 16.61\n");
    let err = store.import(&load_tree(data.path()).unwrap()).unwrap_err();
    match err {
        MeetupError::ConflictingDuplicateKey { table, key, column } => {
            assert_eq!(table, "cities");
            assert_eq!(key, "slug='brno'");
            assert_eq!(column, "name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unreliable_venue_address_ignored() {
    let data = create_test_data();
    let mut store = Store::open_in_memory(TableRegistry::new()).unwrap();
    store.import(&load_tree(data.path()).unwrap()).unwrap();

    write_file(
        data.path(),
        "cities/brno/venues/u-dreveneho-orla.yaml",
        "name: U Dřevěného orla\naddress: Křenová 65c, 602 00 Brno\nlocation:\n  latitude: 49.1913\n  longitude: 16.6192\n",
    );
    let report = store.import(&load_tree(data.path()).unwrap()).unwrap();
    assert!(report.is_noop());
}

#[test]
fn test_duplicate_event_in_one_batch() {
    let data = create_test_data();
    // Same city, date and time as BRNO_2013 but a different name
    write_file(
        data.path(),
        "series/brno-pyvo/events/2013-05-30-copy.yaml",
        "city: brno\nstart: 2013-05-30 19:00:00\nname: Jiné Pyvo\n",
    );
    let err = MeetupDb::open(test_config(data.path())).err().unwrap();
    assert!(matches!(err, MeetupError::ConflictingDuplicateKey { table: "events", .. }));
}

// =============================================================================
// Failure Leaves Nothing Behind
// =============================================================================

#[test]
fn test_unsupported_schema_version() {
    let data = create_test_data();
    write_file(data.path(), "meta.yaml", "version: 2\n");
    let err = MeetupDb::open(test_config(data.path())).err().unwrap();
    assert!(matches!(err, MeetupError::UnsupportedSchemaVersion { found: 2, expected: 1 }));
    assert_eq!(err.to_string(), "Unsupported schema version 2 (expected 1)");
}

#[test]
fn test_referential_failure_persists_nothing() {
    let data = create_test_data();
    write_file(
        data.path(),
        "series/ostrava-pyvo/events/2015-01-01.yaml",
        "city: ostrava\nstart: 2015-01-01\nname: Ostravské Pyvo\nvenue: nowhere\n",
    );
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("meetups.sqlite");

    let err = MeetupDb::open(test_config(data.path()).with_database(&db_path)).err().unwrap();
    assert!(matches!(err, MeetupError::UnknownReference { kind: "venue", .. }));

    let store = Store::open(&db_path, TableRegistry::new()).unwrap();
    for table in ["cities", "venues", "series", "speakers", "events", "talks", "talk_links"] {
        assert_eq!(count(store.connection(), table), 0, "rows left in {table}");
    }
}

#[test]
fn test_malformed_document_names_file() {
    let data = create_test_data();
    write_file(data.path(), BRNO_2014, "city: brno\nstart: someday\nname: Pyvo\n");
    let err = MeetupDb::open(test_config(data.path())).err().unwrap();
    match err {
        MeetupError::Document { path, message } => {
            assert!(path.ends_with(BRNO_2014));
            assert!(message.contains("someday"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_serialized_event_keeps_document_order() {
    let data = create_test_data();
    let db = MeetupDb::open(test_config(data.path())).unwrap();

    let original: EventDoc = read_yaml(&data.path().join(BRNO_2013)).unwrap();
    let reloaded = db.event(0).unwrap().to_document();
    assert_eq!(reloaded.talks, original.talks);
    assert_eq!(reloaded.urls, original.urls);
    assert_eq!(reloaded.talks[0].speakers, ["Petr Viktorin", "Miro Hrončok"]);

    // Writing it back produces the same document
    let text = serde_yaml::to_string(&reloaded).unwrap();
    let parsed: EventDoc = serde_yaml::from_str(&text).unwrap();
    assert_eq!(parsed, reloaded);
}

#[test]
fn test_json_keeps_document_order() {
    let data = create_test_data();
    let db = MeetupDb::open(test_config(data.path())).unwrap();

    let json = db.event(2).unwrap().to_json().unwrap();
    let keys: Vec<usize> = ["\"city\"", "\"start\"", "\"name\"", "\"number\"", "\"venue\"", "\"talks\""]
        .iter()
        .map(|k| json.find(k).unwrap())
        .collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert!(json.contains("\"start\": \"2013-12-04 18:00:00\""));
}

#[test]
fn test_event_title() {
    let data = create_test_data();
    let db = MeetupDb::open(test_config(data.path())).unwrap();

    assert_eq!(db.event(0).unwrap().title(), "Brněnské Pyvo");
    assert_eq!(db.event(1).unwrap().title(), "Brněnské Pyvo – Podzim");
    assert_eq!(db.event(2).unwrap().title(), "Ostravské Pyvo #1");
}

#[test]
fn test_missing_data_directory() {
    let dir = TempDir::new().unwrap();
    let err = MeetupDb::open(test_config(&dir.path().join("nothing"))).err().unwrap();
    assert!(matches!(err, MeetupError::Io { .. }));
}
