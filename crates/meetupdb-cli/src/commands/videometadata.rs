//! Videometadata command - config files for cutting meetup recordings.

use std::fs;
use std::path::{Path, PathBuf};

use meetupdb::{slugify, EventRecord, MeetupError};
use serde::Serialize;

use crate::cli::{GlobalOptions, OutputFormat};

/// Settings for one recording, read by the video cutting tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct VideoConfig {
    speaker: String,
    title: String,
    lightning: bool,
    speaker_only: bool,
    widescreen: bool,
    speaker_vid: &'static str,
    screen_vid: &'static str,
    event: String,
    date: String,
    url: String,
}

impl VideoConfig {
    /// Event-level settings, with no talk filled in.
    fn for_event(event: &EventRecord) -> Self {
        let mut name = event.name.clone();
        if let Some(number) = event.number {
            name.push_str(&format!(" #{}", number));
        }
        Self {
            speaker: String::new(),
            title: String::new(),
            lightning: true,
            speaker_only: false,
            widescreen: false,
            speaker_vid: "*.MTS",
            screen_vid: "*.ts",
            event: name,
            date: event.date.format("%Y-%m-%d").to_string(),
            url: format!("https://pyvo.cz/{}/{}/", event.series, event.slug()),
        }
    }
}

pub fn run(global: &GlobalOptions, city: &str, date: &str, outpath: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_db(global)?;
    let today = db.today();
    let id = db.find_event(city, date, today)?;
    let event = db.event(id)?;

    let format = global.output_format();
    if format != OutputFormat::Text {
        return super::show::print_event(&event, format, today, global.verbose);
    }

    for (dir, yaml) in write_configs(&event, outpath)? {
        if !global.quiet {
            println!("{}", dir.display());
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Write `config.yaml` for the event and for each talk under `outpath`.
/// Returns each directory written with the YAML put there.
fn write_configs(event: &EventRecord, outpath: &Path) -> meetupdb::Result<Vec<(PathBuf, String)>> {
    let event_dir = outpath.join(format!("{}-{}", event.city.name, event.slug()));
    let mut config = VideoConfig::for_event(event);
    let mut written = vec![(event_dir.clone(), dump_config(&event_dir, &config)?)];

    for (number, talk) in event.talks.iter().enumerate() {
        config.speaker = talk.speakers.join(", ");
        config.title = talk.title.clone();
        config.lightning = talk.is_lightning;
        let talk_dir = event_dir.join(format!("{:02}-{}", number + 1, slugify(&talk.title)));
        let yaml = dump_config(&talk_dir, &config)?;
        written.push((talk_dir, yaml));
    }
    Ok(written)
}

fn dump_config(dir: &Path, config: &VideoConfig) -> meetupdb::Result<String> {
    let yaml = serde_yaml::to_string(config)?;
    fs::create_dir_all(dir).map_err(|e| MeetupError::io(dir, e))?;
    let path = dir.join("config.yaml");
    fs::write(&path, &yaml).map_err(|e| MeetupError::io(&path, e))?;
    Ok(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use meetupdb::record::{CityRef, TalkRecord};
    use tempfile::TempDir;

    fn sample_event() -> EventRecord {
        let talk = |title: &str, lightning: bool, speakers: &[&str]| TalkRecord {
            title: title.to_string(),
            is_lightning: lightning,
            description: None,
            speakers: speakers.iter().map(|s| s.to_string()).collect(),
            links: vec![],
        };
        EventRecord {
            id: 1,
            series: "brno-pyvo".to_string(),
            city: CityRef {
                id: 0,
                slug: "brno".to_string(),
                name: "Brno".to_string(),
            },
            venue: None,
            name: "Brněnské Pyvo".to_string(),
            number: Some(12),
            topic: Some("Podzim".to_string()),
            description: None,
            date: NaiveDate::from_ymd_opt(2014, 9, 25).unwrap(),
            start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            source: None,
            talks: vec![
                talk("Django 1.7", false, &["Petr Viktorin", "Miro Hrončok"]),
                talk("Anketa!", true, &["Miro Hrončok"]),
            ],
            links: vec![],
        }
    }

    #[test]
    fn test_write_configs() {
        let out = TempDir::new().unwrap();
        let written = write_configs(&sample_event(), out.path()).unwrap();

        let event_dir = out.path().join("Brno-2014-09-25-podzim");
        let dirs: Vec<&Path> = written.iter().map(|(dir, _)| dir.as_path()).collect();
        assert_eq!(
            dirs,
            [
                event_dir.as_path(),
                event_dir.join("01-django-1-7").as_path(),
                event_dir.join("02-anketa").as_path(),
            ]
        );

        let event_yaml = fs::read_to_string(event_dir.join("config.yaml")).unwrap();
        let keys: Vec<&str> = event_yaml.lines().filter_map(|l| l.split(':').next()).collect();
        assert_eq!(
            keys,
            ["speaker", "title", "lightning", "speaker_only", "widescreen", "speaker_vid", "screen_vid", "event", "date", "url"]
        );
        let config: serde_yaml::Value = serde_yaml::from_str(&event_yaml).unwrap();
        assert_eq!(config["speaker"], "");
        assert_eq!(config["lightning"], true);
        assert_eq!(config["speaker_vid"], "*.MTS");
        assert_eq!(config["event"], "Brněnské Pyvo #12");
        assert_eq!(config["date"], "2014-09-25");
        assert_eq!(config["url"], "https://pyvo.cz/brno-pyvo/2014-09-25-podzim/");

        let talk_yaml = fs::read_to_string(event_dir.join("01-django-1-7/config.yaml")).unwrap();
        let config: serde_yaml::Value = serde_yaml::from_str(&talk_yaml).unwrap();
        assert_eq!(config["speaker"], "Petr Viktorin, Miro Hrončok");
        assert_eq!(config["title"], "Django 1.7");
        assert_eq!(config["lightning"], false);
        assert_eq!(written[1].1, talk_yaml);
    }

    #[test]
    fn test_event_without_talks_or_number() {
        let out = TempDir::new().unwrap();
        let mut event = sample_event();
        event.number = None;
        event.topic = None;
        event.talks.clear();

        let written = write_configs(&event, out.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, out.path().join("Brno-2014-09-25"));
        let config: serde_yaml::Value = serde_yaml::from_str(&written[0].1).unwrap();
        assert_eq!(config["event"], "Brněnské Pyvo");
    }
}
