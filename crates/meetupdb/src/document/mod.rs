//! Hand-authored meetup documents: the parsed tree, the directory walker
//! that produces it, and slugs.

mod slug;
mod start;
mod tree;
mod walker;

pub use slug::{is_slug, slugify};
pub use start::EventStart;
pub use tree::{
    CityDoc, DataTree, EventDoc, LinkKind, Location, Meta, Recurrence, SeriesDoc, TalkDoc,
    VenueDoc, SCHEMA_VERSION,
};
pub use walker::{load_tree, read_yaml};
