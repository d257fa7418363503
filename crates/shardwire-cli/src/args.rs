//! Command-line arguments.

use anyhow::Context;
use clap::{Parser, Subcommand};
use shardwire_client::ClientConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shardwire", version, about = "Transfer shards to and from farmers")]
pub struct Cli {
    /// TOML file with client settings.
    #[arg(long, env = "SHARDWIRE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Give up dialing a farmer after this many seconds.
    #[arg(long, env = "SHARDWIRE_CONNECT_TIMEOUT", global = true)]
    pub connect_timeout: Option<u64>,

    /// Bytes per binary frame when pushing.
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a shard.
    Pull {
        /// JSON transfer pointer with operation PULL.
        #[arg(long)]
        pointer: PathBuf,
        /// Where to write the shard.
        #[arg(long)]
        out: PathBuf,
    },
    /// Upload a shard.
    Push {
        /// JSON transfer pointer with operation PUSH.
        #[arg(long)]
        pointer: PathBuf,
        /// File holding the shard.
        #[arg(long)]
        input: PathBuf,
    },
}

impl Cli {
    /// Config file values, overridden by flags.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = Some(secs);
        }
        if let Some(size) = self.chunk_size {
            anyhow::ensure!(size > 0, "--chunk-size must be greater than zero");
            config.chunk_size = size;
        }
        Ok(config)
    }
}
