//! Skirmish game server.

use std::path::PathBuf;

use clap::Parser;
use skirmish::{ServerConfig, SkirmishServer};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line arguments. Flags override the config file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Force the world seed (signed 64-bit, as sent on the wire)
    #[arg(short, long, allow_negative_numbers = true)]
    seed: Option<i64>,
    /// Path to the TOML config file
    #[arg(short, long, default_value = "skirmish.toml")]
    config: PathBuf,
    /// Address to bind to
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Skirmish server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ServerConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(seed) = args.seed {
        config.server.seed = Some(seed as u64);
    }

    let server = SkirmishServer::builder().config(config).build().await?;
    info!(
        addr = %server.local_addr()?,
        seed = server.seed() as i64,
        tick_rate = server.tick_rate(),
        "listening"
    );

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, shutting down");
                let _ = stop.send(true);
            }
            Err(e) => {
                error!(error = %e, "cannot listen for Ctrl+C");
                // Keep the sender alive; dropping it would stop the server.
                std::future::pending::<()>().await;
            }
        }
    });

    server.run(shutdown).await?;
    info!("server stopped");
    Ok(())
}
