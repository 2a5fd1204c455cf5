//! MeetupDb: a relational store of recurring community meetups.
//!
//! Meetups are written by hand as a directory of YAML documents (cities,
//! venues, series and their events with talks and links). MeetupDb loads
//! that directory into SQLite, resolving every cross-reference to a
//! surrogate key, and lets a single event be replaced or removed so that
//! the store and the files change together or not at all.
//!
//! # Core Principles
//!
//! - **Consistent**: natural keys are unique; re-declaring one differently is an error
//! - **Atomic**: an import or a revision lands completely or not at all
//! - **Files first**: the documents are the source of truth, the store is derived
//!
//! # Example
//!
//! ```no_run
//! use meetupdb::{MeetupConfig, MeetupDb};
//!
//! let db = MeetupDb::open(MeetupConfig::new("data")).unwrap();
//! let id = db.find_event("brno", "", db.today()).unwrap();
//! let event = db.event(id).unwrap();
//!
//! println!("{} on {}", event.title(), event.date);
//! println!("Talks: {}", event.talks.len());
//! ```

pub mod document;
pub mod error;
pub mod normalize;
pub mod record;
pub mod revision;
pub mod schema;
pub mod store;

mod meetupdb;

pub use crate::meetupdb::{MeetupConfig, MeetupDb};
pub use document::{load_tree, slugify, DataTree, EventDoc, EventStart, TalkDoc};
pub use error::{MeetupError, Result};
pub use normalize::{ImportReport, Normalizer};
pub use record::{DateQuery, EventRecord};
pub use revision::{Action, CommitOutcome, Console, EditSession, Editor, SessionOutcome, StagedChange};
pub use schema::{TableKind, TableRegistry};
pub use store::Store;
