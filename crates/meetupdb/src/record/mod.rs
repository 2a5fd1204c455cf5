//! Reading events back out of the store and finding them by date.

mod event;
mod selection;

pub use event::{event_destination, title_parts, CityRef, EventRecord, TalkLink, TalkRecord, VenueRecord};
pub use selection::{city_events, find_city, find_event, select_event, DateQuery};
