//! Demo farmer.
//!
//! Serves shards from a directory and stores pushed ones there, so the
//! `shardwire` CLI can be tried end to end:
//!
//!   cargo run -p shardwire-demo-farmer -- --port 4000 --dir /tmp/shards
//!   shardwire pull --pointer pull.json --out shard.bin
//!
//! Any token is accepted.

mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("farmer=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = parse_arg(&args, "--port").unwrap_or(4000);
    let dir = parse_arg_string(&args, "--dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shards"));
    let idle = Duration::from_millis(parse_arg(&args, "--idle-ms").unwrap_or(500));

    tokio::fs::create_dir_all(&dir).await?;
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    tracing::info!("Farming shards in {} on {}", dir.display(), addr);

    server::run(addr, dir, idle).await
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn parse_arg_string(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
