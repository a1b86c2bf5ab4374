//! Manual starter for the fakeserver
//!
//! Runs the mission-control mock standalone, so the provider can be exercised
//! against it without access to the real management API.
//!
//! Usage:
//!   fakeserver --port 8091 --settle-secs 10
//!   fakeserver --base-sid 1234   # deterministic sequential ids

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clustermgr_fakeserver::{FakeServer, FakeServerConfig, IdMode, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "fakeserver")]
#[command(about = "In-memory mock of the mission-control event-broker API")]
struct Args {
    /// The port fakeserver will listen on
    #[arg(long, default_value_t = 8091)]
    port: u16,

    /// Generate ids from a sequence starting with this; 0 selects UUIDs
    #[arg(long, default_value_t = 0)]
    base_sid: u64,

    /// Seconds after creation at which a service reports COMPLETED
    #[arg(long, default_value_t = 10)]
    settle_secs: u64,

    /// Enable debug output of the server
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        "clustermgr_fakeserver=debug"
    } else {
        "clustermgr_fakeserver=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let config = FakeServerConfig::default()
        .with_settle_delay(Duration::from_secs(args.settle_secs))
        .with_id_mode(match args.base_sid {
            0 => IdMode::Random,
            base => IdMode::Sequential(base),
        });

    let server = FakeServer::start(args.port, Arc::new(MemoryStore::new()), config).await?;
    println!("Starting server on {}...", server.addr());

    // serve until interrupted
    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}
