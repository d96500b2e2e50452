//! Event records and the rules that turn scraped text into them

pub mod bonus;
pub mod models;
pub mod parser;
pub mod time;

pub use models::{collapse_whitespace, DetailPage, Event, EventType, RawEvent};
pub use parser::{classify_type, parse, parse_all, DEFAULT_DESCRIPTION};
