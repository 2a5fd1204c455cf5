//! Replacing and removing single events.
//!
//! A revision is staged inside a transaction, previewed, and only then
//! committed together with the matching file changes under the data root.
//!
//! ```no_run
//! use meetupdb::{MeetupConfig, MeetupDb};
//!
//! let mut db = MeetupDb::open(MeetupConfig::new("data")).unwrap();
//! let id = db.find_event("brno", "p1", db.today()).unwrap();
//! let new_entry = std::fs::read_to_string("new.yaml").unwrap();
//!
//! let root = db.config().data_dir.clone();
//! let staged = db.store_mut().stage_replace(id, &new_entry, &root).unwrap();
//! println!("{}", staged.diff());
//! staged.commit().unwrap();
//! ```

mod diff;
mod session;
mod staged;

pub use diff::unified_diff;
pub use session::{Action, Console, EditSession, Editor, SessionOutcome, FAILED_ACTIONS, VALID_ACTIONS};
pub use staged::{is_inside_root, CommitOutcome, Phase, RemoveOutcome, StagedChange};
