//! `supabase-task` CLI entry-point.
//!
//! Available sub-commands:
//! - `run`  — execute one step file against Supabase and print its output.
//! - `plan` — print the HTTP request a step file would send, without sending it.
//!
//! Connection keys missing from a step file are filled from `--url`,
//! `--api-key` and `--schema` (or `SUPABASE_URL`, `SUPABASE_API_KEY`,
//! `SUPABASE_SCHEMA`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nodes::registry::operation_kind;
use nodes::tasks::parse_step;
use nodes::{build_node, ExecutionContext, StepDefinition};
use supabase::request::{assemble, header};
use supabase::{ReqwestTransport, TransportOptions};

#[derive(Parser)]
#[command(
    name = "supabase-task",
    about = "Run Supabase PostgREST task steps",
    version
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Abort a request that takes longer than this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Give up connecting after this many seconds.
    #[arg(long, global = true)]
    connect_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Supabase project URL.
    #[arg(long, global = true, env = "SUPABASE_URL")]
    url: Option<String>,
    /// API key sent as `apikey` and bearer token.
    #[arg(long, global = true, env = "SUPABASE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Postgres schema.
    #[arg(long, global = true, env = "SUPABASE_SCHEMA")]
    schema: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a step definition JSON file.
    Run {
        /// Path to the step JSON file.
        path: PathBuf,
    },
    /// Show the request a step definition JSON file would send.
    Plan {
        /// Path to the step JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { path } => {
            let step = load_step(&path, &cli.connection)?;
            let options = TransportOptions {
                timeout: cli.timeout_secs.map(Duration::from_secs),
                connect_timeout: cli.connect_timeout_secs.map(Duration::from_secs),
            };
            let transport = ReqwestTransport::with_options(&options)
                .context("failed to build HTTP client")?;

            let node = build_node(&step, Arc::new(transport))?;
            info!("Running step '{}' ({})", step.id, step.node_type);

            let output = node
                .execute(Value::Null, &ExecutionContext::standalone())
                .await
                .with_context(|| format!("step '{}' failed", step.id))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Plan { path } => {
            let step = load_step(&path, &cli.connection)?;
            let Some(kind) = operation_kind(&step.node_type) else {
                bail!("unknown node_type '{}'", step.node_type);
            };

            let (connection, operation) = parse_step(kind, &step.config)?;
            let request = assemble(&connection, &operation)?;

            println!("{} {}", request.method, request.uri);
            for (name, values) in &request.headers {
                for value in values {
                    let shown = if name == header::API_KEY || name == header::AUTHORIZATION {
                        "[REDACTED]"
                    } else {
                        value.as_str()
                    };
                    println!("{name}: {shown}");
                }
            }
            if let Some(body) = &request.body {
                println!();
                println!("{body}");
            }
        }
    }

    Ok(())
}

/// Read a step file and fill in connection keys it does not set.
fn load_step(path: &Path, connection: &ConnectionArgs) -> anyhow::Result<StepDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    let mut step: StepDefinition = serde_json::from_str(&content)
        .with_context(|| format!("invalid step JSON in {}", path.display()))?;

    let Some(config) = step.config.as_object_mut() else {
        bail!("step '{}' config must be a JSON object", step.id);
    };
    let overrides = [
        ("url", &connection.url),
        ("apiKey", &connection.api_key),
        ("schema", &connection.schema),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            config
                .entry(key)
                .or_insert_with(|| Value::String(value.clone()));
        }
    }

    Ok(step)
}
