//! Google Calendar access: OAuth token handling, the REST client and
//! rendering of events into calendar entries.

pub mod auth;
pub mod client;
pub mod models;
pub mod render;
pub mod time;
pub mod token;

pub use auth::{authorize, Credentials};
pub use client::{CalendarApi, GoogleCalendarClient};
pub use models::{CalendarEntry, NewEntry};
pub use render::render_entry;
pub use token::{StoredToken, TokenManager};
