//! CLI command implementations.

pub mod edit;
pub mod import;
pub mod rm;
pub mod show;
pub mod videometadata;

use meetupdb::{MeetupConfig, MeetupDb};

use crate::cli::GlobalOptions;

/// Load the data directory with the global options applied.
pub(crate) fn open_db(global: &GlobalOptions) -> meetupdb::Result<MeetupDb> {
    MeetupDb::open(config(global))
}

pub(crate) fn config(global: &GlobalOptions) -> MeetupConfig {
    let mut config = MeetupConfig::new(&global.data_dir);
    if let Some(path) = &global.database {
        config = config.with_database(path);
    }
    if let Some(now) = global.now {
        config = config.with_now(now);
    }
    config
}
