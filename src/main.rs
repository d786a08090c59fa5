use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use message_logger::agent::{self, config::Config};
use message_logger::utils;

#[derive(Parser)]
#[command(
    name = "message-logger",
    version,
    about = "Append every message received over a WebSocket to a CSV file"
)]
struct AppCli {
    /// Config file path (JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// WebSocket endpoint, e.g. ws://localhost:8090
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// CSV file messages are appended to
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Serve /health and /status on this local port
    #[arg(long, global = true)]
    status_port: Option<u16>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the resolved configuration and print it without connecting
    Check,
}

impl AppCli {
    fn resolve_config(&self) -> Result<Config> {
        self.resolve_config_with(|key| std::env::var(key).ok())
    }

    /// Defaults < config file < environment (via `lookup`) < CLI flags.
    fn resolve_config_with<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::load(self.config.as_deref())?.apply_overrides(lookup)?;
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if let Some(output) = &self.output {
            cfg.output_path = output.clone();
        }
        if self.status_port.is_some() {
            cfg.status_port = self.status_port;
        }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();
    let cfg = args.resolve_config()?;

    match args.command {
        Some(Commands::Check) => {
            let endpoint = cfg.validate()?;
            info!(endpoint = %endpoint, "configuration is valid");
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        None => {
            // Default: run until Ctrl+C or the connection ends
            agent::daemon::run(cfg).await?;
        }
    }

    Ok(())
}
