//! Turns a document tree into table rows.

use std::collections::HashMap;

use chrono::NaiveTime;
use rusqlite::Connection;
use tracing::debug;

use crate::document::{is_slug, DataTree, EventDoc, LinkKind, TalkDoc, SCHEMA_VERSION};
use crate::error::{MeetupError, Result};
use crate::schema::{TableKind, TableRegistry, PROVENANCE_COLUMN};
use crate::store::{bulk_insert, BulkInserter, Row, Value};

use super::report::ImportReport;

/// Speaker name to surrogate id.
type SpeakerIndex = HashMap<String, i64>;

/// Walks a [`DataTree`] in dependency order and stages its rows.
///
/// Phases run to completion one after another because each references ids
/// allocated by the ones before:
///
/// 1. schema version check
/// 2. speakers, collected from every talk
/// 3. cities, then their venues
/// 4. series
/// 5. events
/// 6. per event: talks with their speakers and links, then event links
///
/// Rows are buffered until the whole tree is staged, so any failure leaves
/// the connection untouched.
pub struct Normalizer<'r> {
    registry: &'r TableRegistry,
    default_start_time: NaiveTime,
}

impl<'r> Normalizer<'r> {
    pub fn new(registry: &'r TableRegistry, default_start_time: NaiveTime) -> Self {
        Self {
            registry,
            default_start_time,
        }
    }

    /// Stage and flush every row of `tree` through `conn`.
    pub fn normalize(&self, conn: &Connection, tree: &DataTree) -> Result<ImportReport> {
        if tree.meta.version != SCHEMA_VERSION {
            return Err(MeetupError::UnsupportedSchemaVersion {
                found: tree.meta.version,
                expected: SCHEMA_VERSION,
            });
        }

        let (event_ids, stats) = bulk_insert(conn, self.registry, |ins| {
            let speakers = insert_speakers(ins, tree)?;
            insert_cities(ins, tree)?;
            let series = insert_series(ins, tree)?;
            let events = self.insert_events(ins, tree, &series)?;
            for (event_id, event) in &events {
                insert_talks(ins, *event_id, event, &speakers)?;
                insert_event_links(ins, *event_id, event)?;
            }
            debug!(events = events.len(), "Staged talks and links");
            Ok(events.into_iter().map(|(id, _)| id).collect())
        })?;

        Ok(ImportReport { stats, event_ids })
    }

    fn insert_events<'t>(
        &self,
        ins: &mut BulkInserter<'_>,
        tree: &'t DataTree,
        series_ids: &HashMap<&str, i64>,
    ) -> Result<Vec<(i64, &'t EventDoc)>> {
        let mut events = Vec::new();
        for (series_slug, event) in tree.events() {
            let referrer = describe_event(event);
            // Every series of the tree went through insert_series.
            let series_id = series_ids.get(series_slug).copied().ok_or_else(|| {
                MeetupError::UnknownReference {
                    kind: "series",
                    key: series_slug.to_string(),
                    referrer: referrer.clone(),
                }
            })?;
            let city_id = resolve_city(ins, &event.city, &referrer)?;
            let venue_id = match &event.venue {
                Some(venue) => Some(resolve_venue(ins, city_id, venue, &referrer)?),
                None => None,
            };
            let start = event.start.resolve(self.default_start_time);

            let row = Row::new()
                .with("series_id", series_id)
                .with("city_id", city_id)
                .with("venue_id", venue_id)
                .with("name", event.name.clone())
                .with("number", event.number)
                .with("topic", event.topic.clone())
                .with("description", event.description.clone())
                .with("date", start.date().format("%Y-%m-%d").to_string())
                .with("start_time", start.time().format("%H:%M:%S").to_string())
                .with(PROVENANCE_COLUMN, source_text(event.source.as_deref()));
            events.push((ins.insert_keyed(TableKind::Event, row)?, event));
        }
        debug!(events = events.len(), "Staged events");
        Ok(events)
    }
}

fn insert_speakers(ins: &mut BulkInserter<'_>, tree: &DataTree) -> Result<SpeakerIndex> {
    let mut speakers = SpeakerIndex::new();
    for (_, event) in tree.events() {
        for name in event.talks.iter().flat_map(|t| &t.speakers) {
            if speakers.contains_key(name) {
                continue;
            }
            let id = ins.insert_keyed(TableKind::Speaker, Row::new().with("name", name.clone()))?;
            speakers.insert(name.clone(), id);
        }
    }
    debug!(speakers = speakers.len(), "Staged speakers");
    Ok(speakers)
}

fn insert_cities(ins: &mut BulkInserter<'_>, tree: &DataTree) -> Result<()> {
    for (slug, city) in &tree.cities {
        check_slug(slug)?;
        let row = Row::new()
            .with("slug", slug.clone())
            .with("name", city.name.clone())
            .with("latitude", city.latitude)
            .with("longitude", city.longitude)
            .with(PROVENANCE_COLUMN, source_text(city.source.as_deref()));
        let city_id = ins.insert_keyed(TableKind::City, row)?;

        for (venue_slug, venue) in &city.venues {
            check_slug(venue_slug)?;
            let row = Row::new()
                .with("city_id", city_id)
                .with("slug", venue_slug.clone())
                .with("name", venue.name.clone())
                .with("address", venue.address.clone())
                .with("latitude", venue.location.latitude)
                .with("longitude", venue.location.longitude);
            ins.insert_keyed(TableKind::Venue, row)?;
        }
    }
    debug!(cities = tree.cities.len(), "Staged cities and venues");
    Ok(())
}

/// Stage declared series; resolve bare references to stored ones.
fn insert_series<'t>(ins: &mut BulkInserter<'_>, tree: &'t DataTree) -> Result<HashMap<&'t str, i64>> {
    let mut ids = HashMap::new();
    for (slug, series) in &tree.series {
        check_slug(slug)?;
        let referrer = format!("series '{}'", slug);
        let id = match &series.name {
            Some(name) => {
                let home_city_id = match &series.city {
                    Some(city) => Some(resolve_city(ins, city, &referrer)?),
                    None => None,
                };
                let recurrence = series.recurrence.as_ref();
                let row = Row::new()
                    .with("slug", slug.clone())
                    .with("name", name.clone())
                    .with("home_city_id", home_city_id)
                    .with("recurrence_rule", recurrence.map(|r| r.rule.clone()))
                    .with("recurrence_description", recurrence.and_then(|r| r.description.clone()));
                ins.insert_keyed(TableKind::Series, row)?
            }
            None => ins
                .find_id(TableKind::Series, &[Value::Text(slug.clone())])?
                .ok_or_else(|| MeetupError::UnknownReference {
                    kind: "series",
                    key: slug.clone(),
                    referrer: "single-event import".to_string(),
                })?,
        };
        ids.insert(slug.as_str(), id);
    }
    debug!(series = ids.len(), "Staged series");
    Ok(ids)
}

fn insert_talks(
    ins: &mut BulkInserter<'_>,
    event_id: i64,
    event: &EventDoc,
    speakers: &SpeakerIndex,
) -> Result<()> {
    for (index, talk) in event.talks.iter().enumerate() {
        let row = Row::new()
            .with("event_id", event_id)
            .with("index", index as i64)
            .with("title", talk.title.clone())
            .with("is_lightning", talk.lightning)
            .with("description", talk.description.clone());
        let talk_id = ins.insert_keyed(TableKind::Talk, row)?;

        for (index, name) in talk.speakers.iter().enumerate() {
            let speaker_id =
                speakers
                    .get(name)
                    .copied()
                    .ok_or_else(|| MeetupError::UnknownSpeakerReference {
                        speaker: name.clone(),
                        talk: talk.title.clone(),
                    })?;
            let row = Row::new()
                .with("talk_id", talk_id)
                .with("speaker_id", speaker_id)
                .with("index", index as i64);
            ins.insert(TableKind::TalkSpeaker, row)?;
        }

        for (index, (kind, url)) in talk_links(talk).enumerate() {
            let row = Row::new()
                .with("talk_id", talk_id)
                .with("url", url.to_string())
                .with("index", index as i64)
                .with("kind", kind.as_str().to_string());
            ins.insert(TableKind::TalkLink, row)?;
        }
    }
    Ok(())
}

/// The links of a talk in stored order: its own urls, then coverage.
fn talk_links(talk: &TalkDoc) -> impl Iterator<Item = (LinkKind, &str)> {
    let own = talk.urls.iter().map(|url| (LinkKind::Talk, url.as_str()));
    let coverage = talk
        .coverage
        .iter()
        .flat_map(|entry| entry.iter().map(|(kind, url)| (*kind, url.as_str())));
    own.chain(coverage)
}

fn insert_event_links(ins: &mut BulkInserter<'_>, event_id: i64, event: &EventDoc) -> Result<()> {
    for (index, url) in event.urls.iter().enumerate() {
        let row = Row::new()
            .with("event_id", event_id)
            .with("url", url.clone())
            .with("index", index as i64);
        ins.insert(TableKind::EventLink, row)?;
    }
    Ok(())
}

fn resolve_city(ins: &BulkInserter<'_>, slug: &str, referrer: &str) -> Result<i64> {
    ins.find_id(TableKind::City, &[Value::Text(slug.to_string())])?
        .ok_or_else(|| MeetupError::UnknownReference {
            kind: "city",
            key: slug.to_string(),
            referrer: referrer.to_string(),
        })
}

fn resolve_venue(ins: &BulkInserter<'_>, city_id: i64, slug: &str, referrer: &str) -> Result<i64> {
    ins.find_id(
        TableKind::Venue,
        &[Value::Integer(city_id), Value::Text(slug.to_string())],
    )?
    .ok_or_else(|| MeetupError::UnknownReference {
        kind: "venue",
        key: slug.to_string(),
        referrer: referrer.to_string(),
    })
}

fn check_slug(key: &str) -> Result<()> {
    if is_slug(key) {
        Ok(())
    } else {
        Err(MeetupError::InvalidSlug(key.to_string()))
    }
}

fn source_text(path: Option<&std::path::Path>) -> Option<String> {
    path.map(|p| p.display().to_string())
}

fn describe_event(event: &EventDoc) -> String {
    match &event.source {
        Some(path) => path.display().to_string(),
        None => format!("event in {} on {}", event.city, event.start),
    }
}
