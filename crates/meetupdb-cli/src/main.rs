//! meetupdb CLI - query and edit meetup records.

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let global = &cli.global;

    let default_level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Some(enabled) = global.color_override() {
        colored::control::set_override(enabled);
    }

    let result = match &cli.command {
        Commands::Show { city, date } => commands::show::run(global, city, date),

        Commands::Edit {
            city,
            date,
            interactive,
            batch,
        } => commands::edit::run(global, city, date, commands::edit::Mode::from_flags(*interactive, *batch)),

        Commands::Rm { city, date } => commands::rm::run(global, city, date),

        Commands::Import => commands::import::run(global),

        Commands::Videometadata { city, date, outpath } => commands::videometadata::run(global, city, date, outpath),
    };

    if let Err(e) = result {
        match e.downcast_ref::<meetupdb::MeetupError>() {
            // Not finding a meetup is an answer, not a failure
            Some(err) if err.is_lookup_failure() => {
                println!("{}", err);
                std::process::exit(1);
            }
            _ => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
