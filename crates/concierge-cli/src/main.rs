//! CLI entry point for Concierge.
//!
//! This binary provides the `concierge` command with subcommands for listing
//! available tools, calling a single tool, serving a JSON-lines loop over
//! stdin, and checking adapter status.

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use concierge_adapters::{
    AsanaAdapter, CalendarAdapter, MedicareAdapter, PerplexityAdapter, PlacesAdapter,
};
use concierge_core::{AdapterRegistry, HealthStatus};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Concierge -- callable tools over upstream service APIs.
#[derive(Parser)]
#[command(
    name = "concierge",
    version,
    about = "Concierge -- callable tools over upstream service APIs",
    long_about = "Exposes task management, calendaring, mapping, hospital quality data, and \
                  AI research as uniform callable tools backed by upstream REST APIs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every available tool across all adapters.
    Tools,

    /// Call a single tool and print its result.
    Call {
        /// The tool name, e.g. `asana_create_task`.
        tool: String,

        /// Tool parameters as a JSON object.
        #[arg(long, short, default_value = "{}")]
        params: String,
    },

    /// Serve a JSON-lines request loop over stdin/stdout.
    Serve,

    /// Show adapter health and credential status.
    Status,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tools => cmd_tools(),
        Commands::Call { tool, params } => cmd_call(&tool, &params).await,
        Commands::Serve => cmd_serve().await,
        Commands::Status => cmd_status(),
    }
}

fn build_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(AsanaAdapter::new()));
    registry.register(Arc::new(CalendarAdapter::new()));
    registry.register(Arc::new(PlacesAdapter::new()));
    registry.register(Arc::new(MedicareAdapter::new()));
    registry.register(Arc::new(PerplexityAdapter::new()));
    registry
}

// ---------------------------------------------------------------------------
// Subcommand: tools
// ---------------------------------------------------------------------------

fn cmd_tools() -> Result<()> {
    init_tracing("warn");
    let registry = build_registry();

    for adapter in registry.adapters() {
        println!();
        println!("  {} ({})", adapter.id(), adapter.adapter_type());
        for tool in adapter.tools() {
            println!("    {:<42} {}", tool.name, tool.description);
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: call
// ---------------------------------------------------------------------------

async fn cmd_call(tool: &str, params: &str) -> Result<()> {
    init_tracing("info");
    let registry = build_registry();

    let params: Value =
        serde_json::from_str(params).context("--params must be a JSON object")?;
    let result = registry.dispatch(tool, params).await;
    println!("{result}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

/// Read one JSON request per line (`{"tool": ..., "params": {...}}`) and
/// write one JSON response per line.
async fn cmd_serve() -> Result<()> {
    init_tracing("info");
    let registry = build_registry();

    info!("serving JSON-lines requests on stdin");
    let stdin = io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = line.context("failed to read input")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "malformed request line");
                println!("{}", json!({"error": format!("malformed request: {e}")}));
                continue;
            }
        };
        let Some(tool) = request.get("tool").and_then(Value::as_str) else {
            println!("{}", json!({"error": "request must name a tool"}));
            continue;
        };
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        let result = registry.dispatch(tool, params).await;
        println!("{}", json!({"tool": tool, "result": result}));
    }

    info!("stdin closed, shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

fn cmd_status() -> Result<()> {
    init_tracing("warn");
    let registry = build_registry();

    println!();
    println!("  Concierge Status");
    println!("  ================");
    println!();
    for adapter in registry.adapters() {
        let health = match adapter.health_check() {
            HealthStatus::Healthy => "OK",
            HealthStatus::Degraded => "DEGRADED",
            HealthStatus::Unhealthy => "NOT CONFIGURED",
        };
        let auth = match adapter.required_auth() {
            Some(auth) => format!("requires {}", auth.env_var),
            None => "no credential required".to_string(),
        };
        println!("  {:<18} {:<16} ({auth})", adapter.id(), health);
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
