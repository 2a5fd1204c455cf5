//! Show command - render one meetup.

use std::fmt::Write;

use chrono::NaiveDate;
use colored::Colorize;
use meetupdb::EventRecord;

use crate::cli::{GlobalOptions, OutputFormat};

const WRAP_WIDTH: usize = 70;

pub fn run(global: &GlobalOptions, city: &str, date: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_db(global)?;
    let today = db.today();
    let id = db.find_event(city, date, today)?;
    let event = db.event(id)?;

    print_event(&event, global.output_format(), today, global.verbose)
}

/// Print `event` in the requested format.
pub(crate) fn print_event(
    event: &EventRecord,
    format: OutputFormat,
    today: NaiveDate,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Yaml => print!("{}", event.to_yaml()?),
        OutputFormat::Json => println!("{}", event.to_json()?),
        OutputFormat::Text => print!("{}", render_event(event, today, verbose)),
    }
    Ok(())
}

/// Human-readable rendering of an event.
pub(crate) fn render_event(event: &EventRecord, today: NaiveDate, verbose: bool) -> String {
    let mut out = String::new();

    let when = match (event.date - today).num_days() {
        0 => "we're meeting",
        d if d < 0 => "we met",
        _ => "we'll meet",
    };
    let _ = writeln!(
        out,
        "{} ({}) {} at the {} meetup",
        event.date.format("%Y-%m-%d"),
        event.date.format("%A, %B %-d, %Y"),
        when,
        event.city.name
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", render_title(event));
    let _ = writeln!(out);

    if let Some(description) = &event.description {
        for line in textwrap::wrap(description, WRAP_WIDTH) {
            let _ = writeln!(out, "    {}", line);
        }
        let _ = writeln!(out);
    }

    if let Some(venue) = &event.venue {
        let _ = write!(out, "at {}", venue.name.bold());
        if let Some(address) = &venue.address {
            let _ = write!(out, ", {}, {}", address, event.city.name);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} N, {} E", venue.latitude, venue.longitude);
        let _ = writeln!(
            out,
            "  http://mapy.cz/zakladni?x={}&y={}&z=17",
            venue.longitude, venue.latitude
        );
        let _ = writeln!(out);
    }

    if !event.talks.is_empty() {
        let _ = writeln!(out, "Talks:");
        for talk in &event.talks {
            if talk.is_lightning {
                let _ = write!(out, "{}", " \u{26a1} ".yellow().bold());
            } else {
                let _ = write!(out, "  ");
            }
            if !talk.speakers.is_empty() {
                let _ = write!(out, "{}: ", talk.speakers.join(", "));
            }
            let _ = writeln!(out, "{}", talk.title.bold());
            if let Some(description) = &talk.description {
                for line in textwrap::wrap(description, WRAP_WIDTH) {
                    let _ = writeln!(out, "      {}", line);
                }
            }
            for link in &talk.links {
                let sigil = if link.youtube_id().is_some() { "[>] " } else { "" };
                let _ = writeln!(out, "    {}{}", sigil, link.url);
            }
            let _ = writeln!(out);
        }
    }

    if !event.links.is_empty() {
        let _ = writeln!(out, "More info online:");
        for url in &event.links {
            let _ = writeln!(out, "  {}", url);
        }
    }

    if verbose {
        if let Some(source) = &event.source {
            let _ = writeln!(out);
            let _ = writeln!(out, "entry loaded from {}", source.display());
        }
    }
    out
}

/// The title with its most specific part in bold.
fn render_title(event: &EventRecord) -> String {
    // (weight, text); the heaviest part is emphasized
    let mut parts = vec![(2, event.name.clone())];
    match (&event.number, &event.topic) {
        (Some(number), _) => parts.push((1, format!("#{}", number))),
        (None, Some(_)) => parts.push((0, "–".to_string())),
        (None, None) => {}
    }
    if let Some(topic) = &event.topic {
        parts.push((3, topic.clone()));
    }

    let heaviest = parts.iter().map(|(w, _)| *w).max().unwrap_or(0);
    parts
        .into_iter()
        .map(|(w, text)| if w == heaviest { text.bold().to_string() } else { text })
        .collect::<Vec<_>>()
        .join(" ")
}
