//! Godot MCP CLI - serves editor tools to MCP clients.
//!
//! This is the main binary entry point. See the `godot_mcp_bridge` library
//! for the core functionality.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use godot_mcp_bridge::{mcp_serve, provider, Config, Dispatcher, ToolRegistry};
use mimalloc::MiMalloc;
use serde_json::{Map, Value};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
/// mimalloc provides better multi-threaded performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "godot-mcp")]
#[command(version)]
#[command(about = "MCP server that drives a running Godot editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (launched by an MCP client)
    Serve {
        /// WebSocket URL of the editor plugin
        #[arg(long)]
        url: Option<String>,
        /// Run without an editor; every tool reports the editor unavailable
        #[arg(long)]
        offline: bool,
    },
    /// Print the tool listing as JSON
    Tools,
    /// Invoke one tool against the editor and print its text
    Call {
        /// Tool name, e.g. list_nodes
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// WebSocket URL of the editor plugin
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the effective configuration, print one key, or set and save one key
    Config {
        /// Config key, e.g. godot_url
        key: Option<String>,
        /// New value to save
        value: Option<String>,
    },
}

/// Logs go to the configured file, else stderr. Stdout carries MCP traffic.
fn init_logging(config: &Config) -> Result<()> {
    let target = match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            env_logger::Target::Pipe(Box::new(file))
        }
        None => env_logger::Target::Stderr,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(target)
        .format_timestamp_secs()
        .init();
    Ok(())
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--args is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("--args must be a JSON object"),
    }
}

/// Run one tool call; returns whether the tool reported an error.
fn call_once(config: &Config, tool: &str, arguments: Map<String, Value>) -> Result<bool> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let registry = Arc::new(ToolRegistry::standard()?);
        let dispatcher = Dispatcher::new(registry, provider::from_config(config));
        let result = dispatcher.dispatch(tool, arguments).await;
        dispatcher.shutdown().await;
        println!("{}", result.text);
        Ok(result.is_error)
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Serve { url, offline } => {
            config.apply_cli_overrides(url.as_deref(), offline);
            init_logging(&config)?;
            log::info!(
                "godot-mcp v{} serving (editor: {})",
                env!("CARGO_PKG_VERSION"),
                if config.offline { "offline" } else { config.godot_url.as_str() }
            );
            mcp_serve::run(&config)?;
        }
        Commands::Tools => {
            let registry = ToolRegistry::standard()?;
            println!("{}", serde_json::to_string_pretty(&registry.listing())?);
        }
        Commands::Call { tool, args, url } => {
            config.apply_cli_overrides(url.as_deref(), false);
            init_logging(&config)?;
            let arguments = parse_arguments(&args)?;
            if call_once(&config, &tool, arguments)? {
                std::process::exit(1);
            }
        }
        Commands::Config { key, value } => match (key, value) {
            (None, _) => println!("{}", serde_json::to_string_pretty(&config)?),
            (Some(key), None) => println!("{}", config.get(&key)?),
            (Some(key), Some(value)) => {
                // Persist the file's own values, not environment overrides.
                let mut stored = Config::load_from_dir(&Config::config_dir()?)?;
                stored.set(&key, &value)?;
                stored.save()?;
                println!("Set {key} = {}", stored.get(&key)?);
            }
        },
    }

    Ok(())
}
