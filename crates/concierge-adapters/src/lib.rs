//! Service adapters for the Concierge runtime.
//!
//! Each module wraps one upstream REST API behind the
//! [`Adapter`](concierge_core::Adapter) trait: task management (Asana),
//! calendaring (Google Calendar), mapping and places (Google Maps Platform),
//! hospital open data (Medicare), and AI-backed research (Perplexity).
//! Adapters are stateless; credentials come from the environment at call
//! time and every tool invocation is an independent request cycle.

pub mod asana;
pub mod calendar;
pub mod medicare;
pub mod perplexity;
pub mod places;

pub use asana::AsanaAdapter;
pub use calendar::CalendarAdapter;
pub use medicare::MedicareAdapter;
pub use perplexity::PerplexityAdapter;
pub use places::PlacesAdapter;
