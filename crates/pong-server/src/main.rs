use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pong::prelude::*;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Two-player pong match server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON configuration file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not read operator commands from stdin
    #[arg(long)]
    no_shell: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve(config, !cli.no_shell));
    // A pending stdin read never finishes on its own.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn serve(config: ServerConfig, shell: bool) -> Result<(), Box<dyn std::error::Error>> {
    let server = PongServer::builder().config(config).build().await?;

    if shell {
        let mut shell = server.shell(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
        tokio::spawn(async move {
            if let Err(e) = shell.run().await {
                tracing::warn!(error = %e, "shell failed");
            }
        });
    }

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.shutdown(),
            Err(e) => tracing::warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    server.run().await?;
    Ok(())
}
