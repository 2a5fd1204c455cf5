//! Events read back from the store.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::document::{slugify, EventDoc, EventStart, LinkKind, TalkDoc};
use crate::error::{MeetupError, Result};

/// A city as referenced by an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRef {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// The venue of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueRecord {
    pub slug: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A link attached to a talk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TalkLink {
    pub url: String,
    pub kind: LinkKind,
}

static YOUTUBE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:(?:www\.|m\.)?youtube\.com/watch\?(?:.*&)?v=|youtu\.be/)([A-Za-z0-9_-]{11})")
        .unwrap()
});

impl TalkLink {
    /// The YouTube video id, if the link points to a YouTube video.
    pub fn youtube_id(&self) -> Option<&str> {
        YOUTUBE_URL
            .captures(&self.url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

/// A talk with its speakers and links, in stored order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TalkRecord {
    pub title: String,
    pub is_lightning: bool,
    pub description: Option<String>,
    pub speakers: Vec<String>,
    pub links: Vec<TalkLink>,
}

/// One stored event with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: i64,
    /// Slug of the owning series.
    pub series: String,
    pub city: CityRef,
    pub venue: Option<VenueRecord>,
    pub name: String,
    pub number: Option<i64>,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// File the event was loaded from, if any.
    pub source: Option<PathBuf>,
    pub talks: Vec<TalkRecord>,
    pub links: Vec<String>,
}

/// Columns of the event query, before date parsing.
struct EventRow {
    series: String,
    city: CityRef,
    venue: Option<VenueRecord>,
    name: String,
    number: Option<i64>,
    topic: Option<String>,
    description: Option<String>,
    date: String,
    start_time: String,
    source: Option<String>,
}

const EVENT_QUERY: &str = r#"
SELECT s.slug, c.id, c.slug, c.name,
       v.slug, v.name, v.address, v.latitude, v.longitude,
       e.name, e.number, e.topic, e.description, e.date, e.start_time, e._source
FROM events e
JOIN series s ON s.id = e.series_id
JOIN cities c ON c.id = e.city_id
LEFT JOIN venues v ON v.id = e.venue_id
WHERE e.id = ?1
"#;

impl EventRecord {
    /// Load event `id`, failing with [`MeetupError::NotFound`] if absent.
    pub fn load(conn: &Connection, id: i64) -> Result<Self> {
        let row = conn
            .query_row(EVENT_QUERY, [id], |r| {
                let venue_slug: Option<String> = r.get(4)?;
                let venue = match venue_slug {
                    Some(slug) => Some(VenueRecord {
                        slug,
                        name: r.get(5)?,
                        address: r.get(6)?,
                        latitude: r.get(7)?,
                        longitude: r.get(8)?,
                    }),
                    None => None,
                };
                Ok(EventRow {
                    series: r.get(0)?,
                    city: CityRef {
                        id: r.get(1)?,
                        slug: r.get(2)?,
                        name: r.get(3)?,
                    },
                    venue,
                    name: r.get(9)?,
                    number: r.get(10)?,
                    topic: r.get(11)?,
                    description: r.get(12)?,
                    date: r.get(13)?,
                    start_time: r.get(14)?,
                    source: r.get(15)?,
                })
            })
            .optional()?
            .ok_or_else(|| MeetupError::NotFound("No such meetup".to_string()))?;

        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|_| MeetupError::InvalidDate(format!("stored date '{}'", row.date)))?;
        let start_time = NaiveTime::parse_from_str(&row.start_time, "%H:%M:%S")
            .map_err(|_| MeetupError::InvalidDate(format!("stored time '{}'", row.start_time)))?;

        Ok(Self {
            id,
            series: row.series,
            city: row.city,
            venue: row.venue,
            name: row.name,
            number: row.number,
            topic: row.topic,
            description: row.description,
            date,
            start_time,
            source: row.source.map(PathBuf::from),
            talks: load_talks(conn, id)?,
            links: load_event_links(conn, id)?,
        })
    }

    /// Display title: name, then `#number` (or a dash before a bare topic),
    /// then topic.
    pub fn title(&self) -> String {
        title_parts(&self.name, self.number, self.topic.as_deref()).join(" ")
    }

    /// The event as a document, ready to be written to its file.
    pub fn to_document(&self) -> EventDoc {
        EventDoc {
            city: self.city.slug.clone(),
            start: EventStart::at(self.date, self.start_time),
            name: self.name.clone(),
            number: self.number,
            topic: self.topic.clone(),
            description: self.description.clone(),
            venue: self.venue.as_ref().map(|v| v.slug.clone()),
            talks: self.talks.iter().map(TalkRecord::to_document).collect(),
            urls: self.links.clone(),
            source: None,
        }
    }

    /// The serialized entry, as written to event files.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_document())?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// `<date>[-<topic>]`, as used in file names and URLs.
    pub fn slug(&self) -> String {
        event_slug(self.date, self.topic.as_deref())
    }
}

impl TalkRecord {
    fn to_document(&self) -> TalkDoc {
        let mut urls = Vec::new();
        let mut coverage = Vec::new();
        for link in &self.links {
            match link.kind {
                LinkKind::Talk => urls.push(link.url.clone()),
                kind => coverage.push(IndexMap::from([(kind, link.url.clone())])),
            }
        }
        TalkDoc {
            title: self.title.clone(),
            lightning: self.is_lightning,
            speakers: self.speakers.clone(),
            urls,
            coverage,
            description: self.description.clone(),
        }
    }

    /// Id of the first YouTube video among the links.
    pub fn youtube_id(&self) -> Option<&str> {
        self.links.iter().find_map(TalkLink::youtube_id)
    }
}

/// Title pieces of an event, in display order.
pub fn title_parts(name: &str, number: Option<i64>, topic: Option<&str>) -> Vec<String> {
    let mut parts = vec![name.to_string()];
    match (number, topic) {
        (Some(number), _) => parts.push(format!("#{}", number)),
        (None, Some(_)) => parts.push("–".to_string()),
        (None, None) => {}
    }
    if let Some(topic) = topic {
        parts.push(topic.to_string());
    }
    parts
}

/// Where an event of `series` lives under the data root:
/// `series/<series>/events/<date>[-<topic>].yaml`.
pub fn event_destination(root: &Path, series: &str, event: &EventDoc) -> PathBuf {
    let file_name = format!("{}.yaml", event_slug(event.start.date, event.topic.as_deref()));
    root.join("series").join(series).join("events").join(file_name)
}

fn event_slug(date: NaiveDate, topic: Option<&str>) -> String {
    let mut slug = date.format("%Y-%m-%d").to_string();
    if let Some(topic) = topic.map(slugify).filter(|t| !t.is_empty()) {
        slug.push('-');
        slug.push_str(&topic);
    }
    slug
}

fn load_talks(conn: &Connection, event_id: i64) -> Result<Vec<TalkRecord>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT id, title, is_lightning, description FROM talks
           WHERE event_id = ?1 ORDER BY "index""#,
    )?;
    let rows = stmt
        .query_map([event_id], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, bool>(2)?,
                r.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut talks = Vec::with_capacity(rows.len());
    for (talk_id, title, is_lightning, description) in rows {
        talks.push(TalkRecord {
            title,
            is_lightning,
            description,
            speakers: load_speakers(conn, talk_id)?,
            links: load_talk_links(conn, talk_id)?,
        });
    }
    Ok(talks)
}

fn load_speakers(conn: &Connection, talk_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT sp.name FROM talk_speakers ts
           JOIN speakers sp ON sp.id = ts.speaker_id
           WHERE ts.talk_id = ?1 ORDER BY ts."index""#,
    )?;
    let names = stmt
        .query_map([talk_id], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn load_talk_links(conn: &Connection, talk_id: i64) -> Result<Vec<TalkLink>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT url, kind FROM talk_links WHERE talk_id = ?1 ORDER BY "index""#,
    )?;
    let rows = stmt
        .query_map([talk_id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|(url, kind)| {
            // The column is constrained to known kinds.
            let kind = LinkKind::parse(&kind).ok_or_else(|| MeetupError::Document {
                path: PathBuf::from(&url),
                message: format!("unknown link kind '{}'", kind),
            })?;
            Ok(TalkLink { url, kind })
        })
        .collect()
}

fn load_event_links(conn: &Connection, event_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT url FROM event_links WHERE event_id = ?1 ORDER BY "index""#,
    )?;
    let urls = stmt
        .query_map([event_id], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_title_parts() {
        assert_eq!(title_parts("Pyvo", None, None).join(" "), "Pyvo");
        assert_eq!(title_parts("Pyvo", Some(12), None).join(" "), "Pyvo #12");
        assert_eq!(title_parts("Pyvo", None, Some("Django")).join(" "), "Pyvo – Django");
        assert_eq!(title_parts("Pyvo", Some(12), Some("Django")).join(" "), "Pyvo #12 Django");
    }

    #[test]
    fn test_youtube_id() {
        let link = |url: &str| TalkLink {
            url: url.to_string(),
            kind: LinkKind::Video,
        };
        assert_eq!(link("http://www.youtube.com/watch?v=HDmCGUKfe7Y").youtube_id(), Some("HDmCGUKfe7Y"));
        assert_eq!(link("https://youtu.be/HDmCGUKfe7Y").youtube_id(), Some("HDmCGUKfe7Y"));
        assert_eq!(
            link("https://www.youtube.com/watch?feature=share&v=HDmCGUKfe7Y").youtube_id(),
            Some("HDmCGUKfe7Y")
        );
        assert_eq!(link("http://lanyrd.com/2013/brnenske-pyvo-brug-kvetnove/schxdm/").youtube_id(), None);
        assert_eq!(link("https://www.youtube.com/user/pyvo").youtube_id(), None);

        let talk = TalkRecord {
            title: "Python 3.3".to_string(),
            is_lightning: false,
            description: None,
            speakers: Vec::new(),
            links: vec![
                link("http://lanyrd.com/2013/brnenske-pyvo-brug-kvetnove/schxdm/"),
                link("https://youtu.be/HDmCGUKfe7Y"),
            ],
        };
        assert_eq!(talk.youtube_id(), Some("HDmCGUKfe7Y"));
    }

    #[test]
    fn test_event_destination() {
        let mut event = EventDoc {
            city: "brno".to_string(),
            start: EventStart::on(date(2014, 7, 31)),
            name: "Brněnské Pyvo".to_string(),
            number: None,
            topic: None,
            description: None,
            venue: None,
            talks: Vec::new(),
            urls: Vec::new(),
            source: None,
        };
        let root = Path::new("/data");
        assert_eq!(
            event_destination(root, "brno-pyvo", &event),
            PathBuf::from("/data/series/brno-pyvo/events/2014-07-31.yaml")
        );

        event.topic = Some("Letní Pyvo!".to_string());
        assert_eq!(
            event_destination(root, "brno-pyvo", &event),
            PathBuf::from("/data/series/brno-pyvo/events/2014-07-31-letni-pyvo.yaml")
        );
    }

    #[test]
    fn test_talk_links_split_by_kind() {
        let talk = TalkRecord {
            title: "Python 3.3".to_string(),
            is_lightning: false,
            description: None,
            speakers: vec!["Petr Viktorin".to_string()],
            links: vec![
                TalkLink { url: "http://a".into(), kind: LinkKind::Talk },
                TalkLink { url: "http://b".into(), kind: LinkKind::Slides },
                TalkLink { url: "http://c".into(), kind: LinkKind::Video },
            ],
        };
        let doc = talk.to_document();
        assert_eq!(doc.urls, ["http://a"]);
        assert_eq!(doc.coverage.len(), 2);
        assert_eq!(doc.coverage[0][&LinkKind::Slides], "http://b");
        assert_eq!(doc.coverage[1][&LinkKind::Video], "http://c");
    }

    #[test]
    fn test_load_missing_event() {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::TableRegistry::new().create_tables(&conn).unwrap();
        let err = EventRecord::load(&conn, 7).unwrap_err();
        assert!(err.is_lookup_failure());
    }
}
