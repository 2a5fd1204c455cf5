//! Shared fixtures: a small data directory with two cities.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use meetupdb::MeetupConfig;

pub const BRNO_2013: &str = "series/brno-pyvo/events/2013-05-30.yaml";
pub const BRNO_2014: &str = "series/brno-pyvo/events/2014-09-25-podzim.yaml";
pub const OSTRAVA_2013: &str = "series/ostrava-pyvo/events/2013-12-04.yaml";
pub const OSTRAVA_2014: &str = "series/ostrava-pyvo/events/2014-08-07.yaml";

/// Write `content` to `rel` under `root`, creating directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Create the sample data directory.
pub fn create_test_data() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = dir.path();

    write_file(root, "meta.yaml", "version: 1\n");
    write_file(root, "cities/brno.yaml", "name: Brno\nlatitude: 49.19\nlongitude: 16.61\n");
    write_file(
        root,
        "cities/brno/venues/u-dreveneho-orla.yaml",
        "name: U Dřevěného orla\naddress: Křenová 65c\nlocation:\n  latitude: 49.1913\n  longitude: 16.6192\n",
    );
    write_file(root, "cities/ostrava.yaml", "name: Ostrava\n");
    write_file(
        root,
        "cities/ostrava/venues/sport-club.yaml",
        "name: Sport Club\nlocation:\n  latitude: 49.8355\n  longitude: 18.2905\n",
    );

    write_file(
        root,
        "series/brno-pyvo/series.yaml",
        "name: Brněnské Pyvo\ncity: brno\nrecurrence:\n  rule: RRULE:FREQ=MONTHLY;BYDAY=-1TH\n",
    );
    write_file(
        root,
        BRNO_2013,
        "\
city: brno
start: 2013-05-30 19:00:00
name: Brněnské Pyvo
venue: u-dreveneho-orla
talks:
- title: Python 3.3
  speakers:
  - Petr Viktorin
  - Miro Hrončok
  urls:
  - http://lanyrd.com/2013/brnenske-pyvo-brug-kvetnove/schxdm/
  coverage:
  - slides: http://www.slideshare.net/encukou/python-33
  - video: https://youtu.be/HDmCGUKfe7Y
- title: Anketa
  lightning: true
  speakers:
  - Miro Hrončok
urls:
- http://lanyrd.com/2013/brnenske-pyvo-brug-kvetnove/
",
    );
    write_file(
        root,
        BRNO_2014,
        "\
city: brno
start: 2014-09-25
name: Brněnské Pyvo
topic: Podzim
venue: u-dreveneho-orla
talks:
- title: Django 1.7
  speakers:
  - Petr Viktorin
",
    );

    write_file(root, "series/ostrava-pyvo/series.yaml", "name: Ostravské Pyvo\ncity: ostrava\n");
    write_file(
        root,
        OSTRAVA_2013,
        "\
city: ostrava
start: 2013-12-04 18:00:00
name: Ostravské Pyvo
number: 1
venue: sport-club
talks:
- title: Úvod
  speakers:
  - Jan Beneš
  coverage:
  - notes: http://example.org/ostrava/1/notes
",
    );
    write_file(
        root,
        OSTRAVA_2014,
        "\
city: ostrava
start: 2014-08-07 19:00:00
name: Ostravské Pyvo
number: 8
venue: sport-club
talks:
- title: Pelican
  speakers:
  - Jan Beneš
",
    );
    dir
}

/// 2014-08-07 12:00, the moment the fixtures are read at.
pub fn test_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2014, 8, 7)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn test_config(root: &Path) -> MeetupConfig {
    MeetupConfig::new(root).with_now(test_now())
}

/// Number of rows in `table`.
pub fn count(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}
