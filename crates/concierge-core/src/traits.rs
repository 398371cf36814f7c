//! Core adapter trait and supporting types.
//!
//! Every service adapter (Asana, Google Calendar, Google Maps Platform,
//! Medicare, Perplexity) implements the [`Adapter`] trait, providing a
//! uniform interface for the host runtime to discover and invoke tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The category of service an adapter proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Productivity tools (task management, calendars).
    Productivity,
    /// Mapping, geocoding, and place data.
    Geospatial,
    /// Public open-data sources.
    PublicData,
    /// Question-answering and research services.
    Knowledge,
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Productivity => write!(f, "productivity"),
            Self::Geospatial => write!(f, "geospatial"),
            Self::PublicData => write!(f, "public_data"),
            Self::Knowledge => write!(f, "knowledge"),
        }
    }
}

/// The health status of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The adapter is fully operational.
    Healthy,
    /// The adapter is usable but a credential or default is missing.
    Degraded,
    /// The adapter is not functional.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// A tool exposed by an adapter that the host runtime can invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Machine-readable tool name (e.g. `asana_list_tasks`).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub parameters: serde_json::Value,
}

/// Authentication requirements for an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequirement {
    /// The credential provider name (e.g. `asana`, `google`).
    pub provider: String,
    /// The environment variable the credential is read from.
    pub env_var: String,
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The universal adapter interface.
///
/// The host runtime discovers available tools via [`Adapter::tools`] and
/// executes them via [`Adapter::execute_tool`]. Tools return a formatted
/// string report; error translation to a display string happens in the
/// registry, so implementations are free to propagate typed errors with `?`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Return the unique identifier for this adapter instance.
    fn id(&self) -> &str;

    /// Return the category of service this adapter proxies.
    fn adapter_type(&self) -> AdapterType;

    /// Check whether the adapter is configured and operational.
    ///
    /// Adapters hold no connections and no state between invocations, so
    /// this only inspects local configuration (credential env vars).
    fn health_check(&self) -> HealthStatus;

    /// Return the list of tools this adapter exposes.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute a named tool with the given JSON parameters.
    ///
    /// Returns the formatted report string on success.
    async fn execute_tool(&self, name: &str, params: serde_json::Value) -> Result<String>;

    /// Return the authentication requirements for this adapter, if any.
    fn required_auth(&self) -> Option<AuthRequirement>;
}
