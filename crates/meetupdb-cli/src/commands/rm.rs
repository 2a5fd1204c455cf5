//! Rm command - remove one meetup entry and its file.

use colored::Colorize;

use crate::cli::GlobalOptions;

pub fn run(global: &GlobalOptions, city: &str, date: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = super::open_db(global)?;
    let id = db.find_event(city, date, db.today())?;
    let outcome = db.remove_event(id)?;

    if let Some(refused) = &outcome.refused {
        eprintln!(
            "{} left {} in place: it is outside the data directory",
            "Warning:".yellow(),
            refused.display()
        );
    }
    if global.verbose {
        if let Some(removed) = &outcome.removed {
            eprintln!("removed {}", removed.display());
        }
    }
    Ok(())
}
