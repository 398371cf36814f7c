//! Shared substrate for Concierge service adapters.
//!
//! Every adapter (Asana, Google Calendar, Google Maps Platform, Medicare,
//! Perplexity) implements the [`Adapter`] trait and is built from the same
//! pieces: parameter validation ([`params`]), request plumbing ([`http`]),
//! report rendering with the output-size guard ([`format`]), and the total
//! error-to-string translation ([`error`]). The [`registry`] wires tool names
//! to adapters and guarantees that no error ever crosses the tool boundary as
//! anything other than a returned string.

pub mod error;
pub mod format;
pub mod http;
pub mod params;
pub mod registry;
pub mod traits;

pub use error::{AdapterError, Result, Violation};
pub use format::{CHARACTER_LIMIT, ResponseFormat};
pub use http::{Envelope, RestClient};
pub use params::ParamReader;
pub use registry::AdapterRegistry;
pub use traits::{Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition};
