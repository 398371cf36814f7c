//! Tool routing across registered adapters.
//!
//! The registry indexes every tool name to the adapter that owns it and
//! exposes [`AdapterRegistry::dispatch`], the single entry point the host
//! runtime calls. Dispatch is total: whatever goes wrong inside an adapter,
//! the caller receives a display string, never an error.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::AdapterError;
use crate::traits::{Adapter, ToolDefinition};

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
    tool_index: HashMap<String, usize>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter and index its tools.
    ///
    /// A duplicate tool name keeps the first registration and logs the
    /// conflict.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        let slot = self.adapters.len();
        for tool in adapter.tools() {
            match self.tool_index.entry(tool.name.clone()) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(slot);
                }
                std::collections::hash_map::Entry::Occupied(_) => {
                    warn!(tool = %tool.name, adapter = %adapter.id(), "duplicate tool name ignored");
                }
            }
        }
        info!(adapter = %adapter.id(), kind = %adapter.adapter_type(), "adapter registered");
        self.adapters.push(adapter);
    }

    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    /// Every tool definition across all registered adapters.
    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.adapters.iter().flat_map(|a| a.tools()).collect()
    }

    /// The adapter owning `tool_name`, if any.
    pub fn find(&self, tool_name: &str) -> Option<&Arc<dyn Adapter>> {
        self.tool_index
            .get(tool_name)
            .and_then(|&slot| self.adapters.get(slot))
    }

    /// Execute a tool by name and return its display string.
    ///
    /// Success returns the tool's formatted report. Any failure, including an
    /// unknown tool name, returns the fixed user-facing error string instead.
    pub async fn dispatch(&self, tool_name: &str, params: Value) -> String {
        let Some(adapter) = self.find(tool_name) else {
            return AdapterError::ToolNotFound {
                adapter_id: String::new(),
                tool_name: tool_name.to_string(),
            }
            .user_message();
        };
        info!(tool = %tool_name, adapter = %adapter.id(), "executing tool");
        match adapter.execute_tool(tool_name, params).await {
            Ok(report) => report,
            Err(err) => {
                warn!(tool = %tool_name, error = %err, "tool execution failed");
                err.user_message()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::traits::{AdapterType, AuthRequirement, HealthStatus};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoAdapter;

    #[async_trait]
    impl Adapter for EchoAdapter {
        fn id(&self) -> &str {
            "echo"
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Knowledge
        }

        fn health_check(&self) -> HealthStatus {
            HealthStatus::Healthy
        }

        fn tools(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: "echo_say".to_string(),
                description: "Echo the input text".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }]
        }

        async fn execute_tool(&self, name: &str, params: Value) -> Result<String> {
            match name {
                "echo_say" => match params.get("text").and_then(|v| v.as_str()) {
                    Some("boom") => Err(AdapterError::Config("no token".into())),
                    Some(text) => Ok(text.to_string()),
                    None => Ok(String::new()),
                },
                _ => Err(AdapterError::ToolNotFound {
                    adapter_id: self.id().to_string(),
                    tool_name: name.to_string(),
                }),
            }
        }

        fn required_auth(&self) -> Option<AuthRequirement> {
            None
        }
    }

    fn registry() -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(EchoAdapter));
        registry
    }

    #[tokio::test]
    async fn dispatch_routes_to_owning_adapter() {
        let out = registry().dispatch("echo_say", json!({"text": "hi"})).await;
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn dispatch_stringifies_adapter_errors() {
        let out = registry().dispatch("echo_say", json!({"text": "boom"})).await;
        assert_eq!(out, "Configuration Error: no token");
    }

    #[tokio::test]
    async fn unknown_tool_returns_message_not_panic() {
        let out = registry().dispatch("no_such_tool", json!({})).await;
        assert_eq!(out, "Error: Unknown tool `no_such_tool`.");
    }

    #[test]
    fn tools_are_aggregated() {
        let registry = registry();
        assert_eq!(registry.tools().len(), 1);
        assert!(registry.find("echo_say").is_some());
    }
}
