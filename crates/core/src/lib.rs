pub mod catalog;
pub mod composer;
pub mod geo;
pub mod interpreter;
pub mod models;

pub use catalog::{normalize_records, PLACE_TYPE_TABLE};
pub use composer::{compose_places_reply, summarize};
pub use geo::{distance_meters, filter_and_sort};
pub use interpreter::{interpret, normalize_text, MessageKind};
pub use models::*;
