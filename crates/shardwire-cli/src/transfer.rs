//! The pull and push commands.

use anyhow::Context;
use shardwire_client::{ClientConfig, Resolver, TransferPointer};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn load_pointer(path: &Path) -> anyhow::Result<TransferPointer> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading pointer {}", path.display()))?;
    TransferPointer::from_json(&json)
        .with_context(|| format!("parsing pointer {}", path.display()))
}

pub async fn pull(config: &ClientConfig, pointer: &Path, out: &Path) -> anyhow::Result<()> {
    let pointer = load_pointer(pointer).await?;
    let mut pull = Resolver::new(config.clone()).pull(&pointer).await?;

    let mut file = File::create(out)
        .await
        .with_context(|| format!("creating {}", out.display()))?;
    let mut total = 0usize;
    while let Some(chunk) = pull.next_chunk().await {
        let chunk = chunk?;
        total += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    tracing::info!(
        "Pulled {} bytes of shard {} from {}",
        total,
        pointer.hash(),
        pointer.farmer()
    );
    Ok(())
}

pub async fn push(config: &ClientConfig, pointer: &Path, input: &Path) -> anyhow::Result<()> {
    let pointer = load_pointer(pointer).await?;
    let mut file = File::open(input)
        .await
        .with_context(|| format!("opening {}", input.display()))?;
    let mut push = Resolver::new(config.clone()).push(&pointer).await?;

    let mut buf = vec![0u8; config.chunk_size];
    let mut total = 0usize;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        push.write(buf[..n].to_vec()).await?;
        total += n;
    }
    push.finish().await?;

    tracing::info!(
        "Pushed {} bytes of shard {} to {}",
        total,
        pointer.hash(),
        pointer.farmer()
    );
    Ok(())
}
