//! Picking one event of a city from a short date expression.
//!
//! | Expression   | Meaning                                   |
//! |--------------|-------------------------------------------|
//! | (empty)      | next event, today included                |
//! | `+N`         | N-th next event, today included           |
//! | `pN`         | N-th previous event, before today         |
//! | `MM`         | the event in that month of this year      |
//! | `YYYY`       | the event in that year                    |
//! | `YY-MM`, `YYYY-MM`       | the event in that month       |
//! | `YY-MM-DD`, `YYYY-MM-DD` | the event on that day         |
//!
//! Date-based expressions must match exactly one event.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::error::{MeetupError, Result};

use super::event::CityRef;

/// A parsed date expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateQuery {
    /// Relative to today: `n >= 0` counts upcoming events (0 and 1 both
    /// mean the next one), `n < 0` counts past events backwards.
    Relative(i64),
    /// Calendar fields to match; a missing year means the current one.
    DateBased {
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
    },
}

impl DateQuery {
    /// Parse a date expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(DateQuery::Relative(0));
        }
        if let Some(n) = expr.strip_prefix('p') {
            return Ok(DateQuery::Relative(-parse_count(expr, n)?));
        }
        if let Some(n) = expr.strip_prefix('+') {
            return Ok(DateQuery::Relative(parse_count(expr, n)?));
        }

        let bad = || MeetupError::InvalidDate(format!("unknown date format '{}'", expr));
        let full = |text: &str, format: &str| NaiveDate::parse_from_str(text, format).map_err(|_| bad());

        match expr.len() {
            2 => {
                let month: u32 = expr.parse().map_err(|_| bad())?;
                if !(1..=12).contains(&month) {
                    return Err(bad());
                }
                Ok(DateQuery::DateBased {
                    year: None,
                    month: Some(month),
                    day: None,
                })
            }
            4 => Ok(DateQuery::DateBased {
                year: Some(expr.parse().map_err(|_| bad())?),
                month: None,
                day: None,
            }),
            5 | 7 => {
                let format = if expr.len() == 5 { "%y-%m-%d" } else { "%Y-%m-%d" };
                let date = full(&format!("{}-01", expr), format)?;
                Ok(DateQuery::DateBased {
                    year: Some(date.year()),
                    month: Some(date.month()),
                    day: None,
                })
            }
            8 | 10 => {
                let format = if expr.len() == 8 { "%y-%m-%d" } else { "%Y-%m-%d" };
                let date = full(expr, format)?;
                Ok(DateQuery::from_date(date))
            }
            _ => Err(bad()),
        }
    }

    /// A query matching exactly `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        DateQuery::DateBased {
            year: Some(date.year()),
            month: Some(date.month()),
            day: Some(date.day()),
        }
    }

    fn matches(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match *self {
            DateQuery::Relative(_) => false,
            DateQuery::DateBased { year, month, day } => {
                date.year() == year.unwrap_or(today.year())
                    && month.is_none_or(|m| date.month() == m)
                    && day.is_none_or(|d| date.day() == d)
            }
        }
    }
}

impl FromStr for DateQuery {
    type Err = MeetupError;

    fn from_str(s: &str) -> Result<Self> {
        DateQuery::parse(s)
    }
}

fn parse_count(expr: &str, digits: &str) -> Result<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MeetupError::InvalidDate(format!("unknown date format '{}'", expr)));
    }
    digits
        .parse()
        .map_err(|_| MeetupError::InvalidDate(format!("count out of range in '{}'", expr)))
}

/// Pick one event id from `(id, date)` candidates.
pub fn select_event(candidates: &[(i64, NaiveDate)], query: DateQuery, today: NaiveDate) -> Result<i64> {
    let not_found = || MeetupError::NotFound("No such meetup".to_string());

    match query {
        DateQuery::Relative(n) if n >= 0 => {
            let mut upcoming: Vec<&(i64, NaiveDate)> =
                candidates.iter().filter(|(_, d)| *d >= today).collect();
            upcoming.sort_by_key(|(id, d)| (*d, *id));
            let nth = usize::try_from(n.max(1) - 1).map_err(|_| not_found())?;
            upcoming.get(nth).map(|(id, _)| *id).ok_or_else(not_found)
        }
        DateQuery::Relative(n) => {
            let mut past: Vec<&(i64, NaiveDate)> =
                candidates.iter().filter(|(_, d)| *d < today).collect();
            past.sort_by_key(|(id, d)| std::cmp::Reverse((*d, *id)));
            let nth = usize::try_from(n.unsigned_abs() - 1).map_err(|_| not_found())?;
            past.get(nth).map(|(id, _)| *id).ok_or_else(not_found)
        }
        DateQuery::DateBased { .. } => {
            let mut matching = candidates.iter().filter(|(_, d)| query.matches(*d, today));
            match (matching.next(), matching.next()) {
                (Some((id, _)), None) => Ok(*id),
                (None, _) => Err(not_found()),
                (Some(_), Some(_)) => Err(MeetupError::AmbiguousMatch(
                    "Multiple meetups match".to_string(),
                )),
            }
        }
    }
}

/// The city whose slug starts with `prefix`; there must be exactly one.
pub fn find_city(conn: &Connection, prefix: &str) -> Result<CityRef> {
    let mut stmt = conn.prepare_cached("SELECT id, slug, name FROM cities ORDER BY slug")?;
    let cities = stmt
        .query_map([], |r| {
            Ok(CityRef {
                id: r.get(0)?,
                slug: r.get(1)?,
                name: r.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut matching = cities.into_iter().filter(|c| c.slug.starts_with(prefix));
    match (matching.next(), matching.next()) {
        (Some(city), None) => Ok(city),
        (None, _) => Err(MeetupError::NotFound(format!("No such city: {}", prefix))),
        (Some(_), Some(_)) => Err(MeetupError::AmbiguousMatch(format!(
            "City is not unique: {}",
            prefix
        ))),
    }
}

/// `(id, date)` of every event held in a city.
pub fn city_events(conn: &Connection, city_id: i64) -> Result<Vec<(i64, NaiveDate)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, date FROM events WHERE city_id = ?1 ORDER BY date, start_time",
    )?;
    let rows = stmt
        .query_map([city_id], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|(id, date)| {
            NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map(|d| (id, d))
                .map_err(|_| MeetupError::InvalidDate(format!("stored date '{}'", date)))
        })
        .collect()
}

/// Resolve a city prefix and date expression to one event id.
pub fn find_event(conn: &Connection, city: &str, expr: &str, today: NaiveDate) -> Result<i64> {
    let city = find_city(conn, city)?;
    let query = DateQuery::parse(expr)?;
    select_event(&city_events(conn, city.id)?, query, today)
}
