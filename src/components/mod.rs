// Export components
pub mod events;
pub mod google_calendar;
pub mod matcher;
pub mod scraper;
pub mod selection;
pub mod sync;
