//! Edit command - replace one meetup entry, interactively or from stdin.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use colored::Colorize;
use meetupdb::{CommitOutcome, SessionOutcome};

use crate::cli::GlobalOptions;
use crate::terminal::{ExternalEditor, TerminalConsole};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Stdin,
}

impl Mode {
    /// `-i`/`-I`, defaulting to interactive when stdin is a terminal.
    pub fn from_flags(interactive: bool, batch: bool) -> Self {
        if interactive {
            Mode::Interactive
        } else if batch || !std::io::stdin().is_terminal() {
            Mode::Stdin
        } else {
            Mode::Interactive
        }
    }
}

pub fn run(global: &GlobalOptions, city: &str, date: &str, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = super::open_db(global)?;
    let id = db.find_event(city, date, db.today())?;

    match mode {
        Mode::Stdin => {
            let mut entry = String::new();
            std::io::stdin().read_to_string(&mut entry)?;
            if entry.trim().is_empty() {
                return Err("No entry given on stdin".into());
            }
            let outcome = db.replace_event(id, &entry)?;
            report_commit(&outcome, global.verbose);
        }
        Mode::Interactive => {
            let editor_command = global.editor_command()?;
            let session = db.edit_session(id)?;
            remove_on_interrupt(session.scratch_path().to_path_buf())?;

            let mut console = TerminalConsole::stdio();
            let mut editor = ExternalEditor::new(editor_command);
            match session.run(&mut console, &mut editor)? {
                SessionOutcome::Saved(outcome) => report_commit(&outcome, global.verbose),
                SessionOutcome::Aborted { abandoned } => {
                    println!("{}", "The file you are abandoning:".yellow());
                    print!("{}", abandoned);
                }
            }
        }
    }
    Ok(())
}

/// Ctrl-C would skip the scratch file's cleanup, so do it here.
fn remove_on_interrupt(scratch: PathBuf) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        let _ = std::fs::remove_file(&scratch);
        eprintln!();
        std::process::exit(130);
    })
}

fn report_commit(outcome: &CommitOutcome, verbose: bool) {
    if let Some(refused) = &outcome.refused {
        eprintln!(
            "{} left {} in place: it is outside the data directory",
            "Warning:".yellow(),
            refused.display()
        );
    }
    if verbose {
        if let Some(removed) = &outcome.removed {
            eprintln!("removed {}", removed.display());
        }
        eprintln!("wrote {}", outcome.written.display());
    }
}
