//! The interactive edit loop.
//!
//! ```text
//! Editing ──> Validating ──> Valid:  save | re-edit | diff | quit
//!    ^                  └──> Failed: re-edit | trace | quit
//!    └──────────── re-edit ─────────────┘
//! ```
//!
//! The loop talks to the user only through [`Console`] and [`Editor`], so it
//! can be driven by a terminal or by a script in tests. The scratch file is
//! removed and any staged transaction rolled back on every way out.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{MeetupError, Result};
use crate::record::EventRecord;
use crate::store::Store;

use super::staged::CommitOutcome;

/// What the user can do at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Save,
    ReEdit,
    ShowDiff,
    ShowTrace,
    Quit,
}

impl Action {
    /// Key the user types to pick this action.
    pub fn key(&self) -> char {
        match self {
            Action::Save => 'y',
            Action::ReEdit => 'e',
            Action::ShowDiff => 'd',
            Action::ShowTrace => 't',
            Action::Quit => 'q',
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Action::Save => "save entry",
            Action::ReEdit => "re-edit",
            Action::ShowDiff => "show current diff",
            Action::ShowTrace => "show error details",
            Action::Quit => "quit",
        }
    }
}

/// Actions offered after a successful validation, default first.
pub const VALID_ACTIONS: &[Action] = &[Action::Save, Action::ReEdit, Action::ShowDiff, Action::Quit];
/// Actions offered after a failed validation, default first.
pub const FAILED_ACTIONS: &[Action] = &[Action::ReEdit, Action::ShowTrace, Action::Quit];

/// User-facing side of the session.
pub trait Console {
    /// Ask which of `actions` to take. The first one is the default.
    fn choose(&mut self, prompt: &str, actions: &[Action]) -> Result<Action>;

    /// Show a diff of the staged entry. `diff` is empty when nothing
    /// changed; `preview` is the staged entry.
    fn show_diff(&mut self, diff: &str, preview: &str);

    /// Report a failed validation; `detailed` asks for the whole error chain.
    fn show_error(&mut self, error: &MeetupError, detailed: bool);
}

/// Opens a file for the user to edit and waits until they are done.
pub trait Editor {
    fn edit(&mut self, path: &Path) -> Result<()>;
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Saved(CommitOutcome),
    /// The user quit; nothing was changed. Holds the last text of the
    /// scratch file so it is not lost.
    Aborted { abandoned: String },
}

/// An interactive edit of one event.
pub struct EditSession<'a> {
    store: &'a mut Store,
    event_id: i64,
    data_root: &'a Path,
    scratch: NamedTempFile,
}

impl<'a> EditSession<'a> {
    /// Prepare a session: the current entry is written to a fresh scratch
    /// file.
    pub fn new(store: &'a mut Store, event_id: i64, data_root: &'a Path) -> Result<Self> {
        let record = EventRecord::load(store.connection(), event_id)?;
        let current = record.to_yaml()?;

        let mut scratch = tempfile::Builder::new()
            .prefix("meetupdb-")
            .suffix(".yaml")
            .tempfile()
            .map_err(|e| MeetupError::io(std::env::temp_dir(), e))?;
        scratch
            .write_all(current.as_bytes())
            .and_then(|_| scratch.flush())
            .map_err(|e| MeetupError::io(scratch.path(), e))?;
        debug!(path = %scratch.path().display(), "Created scratch file");

        Ok(Self {
            store,
            event_id,
            data_root,
            scratch,
        })
    }

    /// Path of the scratch file, for cleanup on signals.
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Run the loop until the user saves or quits.
    pub fn run(self, console: &mut dyn Console, editor: &mut dyn Editor) -> Result<SessionOutcome> {
        let EditSession {
            store,
            event_id,
            data_root,
            scratch,
        } = self;

        editor.edit(scratch.path())?;
        'editing: loop {
            let text = fs::read_to_string(scratch.path()).map_err(|e| MeetupError::io(scratch.path(), e))?;

            match store.stage_replace(event_id, &text, data_root) {
                Ok(staged) => {
                    console.show_diff(&staged.diff(), staged.preview());
                    loop {
                        match console.choose("Save this change?", VALID_ACTIONS)? {
                            Action::Save => return Ok(SessionOutcome::Saved(staged.commit()?)),
                            Action::ReEdit => {
                                staged.discard()?;
                                editor.edit(scratch.path())?;
                                continue 'editing;
                            }
                            Action::ShowDiff => console.show_diff(&staged.diff(), staged.preview()),
                            Action::Quit => {
                                let abandoned = staged.preview().to_string();
                                staged.discard()?;
                                return Ok(SessionOutcome::Aborted { abandoned });
                            }
                            Action::ShowTrace => {}
                        }
                    }
                }
                Err(err) => {
                    console.show_error(&err, false);
                    loop {
                        match console.choose("Re-edit or quit?", FAILED_ACTIONS)? {
                            Action::ReEdit => {
                                editor.edit(scratch.path())?;
                                continue 'editing;
                            }
                            Action::ShowTrace => console.show_error(&err, true),
                            Action::Quit => return Ok(SessionOutcome::Aborted { abandoned: text }),
                            Action::Save | Action::ShowDiff => {}
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_keys_unique() {
        let all = [Action::Save, Action::ReEdit, Action::ShowDiff, Action::ShowTrace, Action::Quit];
        let mut keys: Vec<char> = all.iter().map(Action::key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), all.len());
    }

    #[test]
    fn test_defaults_come_first() {
        assert_eq!(VALID_ACTIONS[0], Action::Save);
        assert_eq!(FAILED_ACTIONS[0], Action::ReEdit);
    }
}
