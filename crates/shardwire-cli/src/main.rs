//! `shardwire`: pull a shard from a farmer into a file, or push a file to one.
//!
//!   shardwire pull --pointer pointer.json --out shard.bin
//!   shardwire push --pointer pointer.json --input shard.bin
//!
//! The pointer file holds a JSON transfer pointer:
//! `{"farmer":{"address":"…","port":4000},"token":"…","hash":"…","operation":"PULL"}`.

mod args;
mod transfer;

use args::{Cli, Command};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shardwire=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = cli.client_config()?;

    match cli.command {
        Command::Pull { pointer, out } => transfer::pull(&config, &pointer, &out).await,
        Command::Push { pointer, input } => transfer::push(&config, &pointer, &input).await,
    }
}
