//! Farmer connection handling.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use shardwire_core::{ControlMessage, HandshakeMessage, Operation};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

const PULL_FRAME_SIZE: usize = 16 * 1024;

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;
type Source = SplitStream<WebSocketStream<TcpStream>>;

pub async fn run(addr: SocketAddr, dir: PathBuf, idle: Duration) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    let dir = Arc::new(dir);
    loop {
        let (stream, client_addr) = listener.accept().await?;
        let dir = dir.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, &dir, idle).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dir: &Path,
    idle: Duration,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    tracing::debug!("New connection from {}", addr);

    // The first data frame must be the handshake.
    let handshake = loop {
        let msg = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("Connection closed before handshake"))??;
        match msg {
            Message::Text(text) => match serde_json::from_str::<HandshakeMessage>(&text) {
                Ok(handshake) => break handshake,
                Err(e) => {
                    tracing::warn!("Invalid handshake from {}: {}", addr, e);
                    return reject(&mut sink, 400, "invalid handshake").await;
                }
            },
            Message::Binary(_) => return reject(&mut sink, 400, "handshake required").await,
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    };

    if !is_shard_name(&handshake.hash) {
        return reject(&mut sink, 400, "invalid shard hash").await;
    }
    let path = dir.join(&handshake.hash);

    match handshake.operation {
        Operation::Pull => serve_pull(&mut sink, &path).await?,
        Operation::Push => accept_push(&mut sink, &mut stream, &path, idle).await?,
    }

    tracing::debug!("Connection closed: {}", addr);
    Ok(())
}

async fn serve_pull(sink: &mut Sink, path: &Path) -> anyhow::Result<()> {
    let shard = match tokio::fs::read(path).await {
        Ok(shard) => shard,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return reject(sink, 404, "shard not found").await;
        }
        Err(e) => return Err(e.into()),
    };

    for chunk in shard.chunks(PULL_FRAME_SIZE) {
        sink.send(Message::binary(chunk.to_vec())).await?;
    }
    sink.close().await?;

    tracing::info!("Served {} ({} bytes)", path.display(), shard.len());
    Ok(())
}

async fn accept_push(
    sink: &mut Sink,
    stream: &mut Source,
    path: &Path,
    idle: Duration,
) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut total = 0usize;

    // No length on the wire: a quiet period marks the end of the shard.
    loop {
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(Ok(Message::Binary(data)))) => {
                file.write_all(&data).await?;
                total += data.len();
            }
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                tracing::warn!("Client left before {} was complete", path.display());
                drop(file);
                tokio::fs::remove_file(path).await?;
                return Ok(());
            }
            Ok(Some(Ok(_))) => {}
            Ok(Some(Err(e))) => return Err(e.into()),
            Err(_) => break,
        }
    }
    file.flush().await?;

    send_control(sink, &ControlMessage::ok("ok")).await?;
    while let Some(Ok(_)) = stream.next().await {}

    tracing::info!("Stored {} ({} bytes)", path.display(), total);
    Ok(())
}

async fn reject(sink: &mut Sink, code: i64, message: &str) -> anyhow::Result<()> {
    send_control(sink, &ControlMessage::error(code, message)).await?;
    sink.close().await?;
    Ok(())
}

async fn send_control(sink: &mut Sink, control: &ControlMessage) -> anyhow::Result<()> {
    sink.send(Message::text(serde_json::to_string(control)?)).await?;
    Ok(())
}

/// Shard hashes become file names; keep them to a single path component.
fn is_shard_name(hash: &str) -> bool {
    !hash.is_empty() && hash.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
