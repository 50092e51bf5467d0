use std::env;

use anyhow::Context;
use clap::{Parser, Subcommand};
use warden_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use warden_server::{Runtime, ServerBuilder};

/// Identity and access-control service.
#[derive(Debug, Parser)]
#[command(name = "warden-server", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Install the reserved groups and permissions, then exit
    Seed,
}

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From WARDEN_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (warden.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (WARDEN_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    warden_server::observability::init_tracing();

    let cli = Cli::parse();
    let (config_path, source) = resolve_config_path(cli.config);

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );
    warden_server::observability::apply_logging_level(&cfg.logging.level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = ServerBuilder::new()
                .with_config(cfg)
                .build()
                .await
                .context("server initialization failed")?;
            server.run().await?;
        }
        Command::Seed => {
            let runtime = Runtime::start(&cfg)
                .await
                .context("startup failed")?;
            let report = runtime.seed().await.context("seeding failed")?;
            if report.is_noop() {
                tracing::info!("reserved groups and permissions already present");
            }
            runtime.shutdown().await;
        }
    }

    Ok(())
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: WARDEN_CONFIG
/// 3. Default: warden.toml
fn resolve_config_path(cli: Option<String>) -> (String, ConfigSource) {
    if let Some(path) = cli {
        return (path, ConfigSource::CliArgument);
    }

    if let Ok(path) = env::var("WARDEN_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
