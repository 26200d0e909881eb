// reviewer-server/src/main.rs
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use reviewer_core::{ProjectConfig, ToolContext};
use rmcp::ServiceExt;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::server::ReviewerServer;

/// MCP server for spec generation, code review, test and lint runs,
/// notifications, music control and a key-value memory.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a Reviewer.toml (default: <workdir>/Reviewer.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project directory commands run in (default: current directory)
    #[arg(short = 'C', long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Stdout carries the protocol, so logs go to stderr and the optional file.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(true);

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {:?}", path))?;
            std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory: {:?}", dir))?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, file_name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    info!(
        "Logging initialized (default level {}, override with RUST_LOG)",
        default_level
    );
    Ok(guard)
}

async fn run(cli: Cli) -> Result<()> {
    let working_dir = match &cli.workdir {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("Working directory not found: {:?}", dir))?,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let config = ProjectConfig::load(cli.config.as_deref(), &working_dir)?;
    info!(
        working_dir = %working_dir.display(),
        provider = ?config.ai_provider,
        "Configuration loaded"
    );
    let ctx = ToolContext::from_config(config, &working_dir).context("Failed to initialize tools")?;

    let service = ReviewerServer::new(ctx)
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server on stdio")?;
    info!("reviewer-mcp listening on stdio");

    let reason = service.waiting().await.context("MCP server loop failed")?;
    info!(?reason, "reviewer-mcp stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = init_logging(&cli)?;

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
