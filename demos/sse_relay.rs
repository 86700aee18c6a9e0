//! Server-sent event chat relay
//!
//! Run with: cargo run --example sse_relay [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example sse_relay                    # binds to 127.0.0.1:4090
//!   cargo run --example sse_relay 0.0.0.0:8080       # binds to 0.0.0.0:8080
//!
//! ## Following the chat
//!
//!   curl -N http://localhost:4090/events
//!
//! Every connection first receives the recent history, then live messages
//! as `new-messages` events.
//!
//! ## Posting
//!
//! Each line typed on stdin is posted as a message. `name: text` sets the
//! message id, otherwise the id is `console`.

use std::net::SocketAddr;
use std::time::Duration;

use chat_hub::sse::{self, SseEvent};
use chat_hub::{BroadcastConfig, ChatConfig, ChatService};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:4090";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,chat_hub=debug")),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
        .parse()?;

    let shutdown = CancellationToken::new();
    // A client that stops reading for this long is dropped instead of stalling the room
    let config = ChatConfig::default()
        .broadcast(BroadcastConfig::default().send_timeout(Duration::from_secs(5)));
    let chat = ChatService::new(config, shutdown.clone());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "SSE relay listening");

    tokio::spawn(read_console(chat.clone()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                chat.shutdown();
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    let chat = chat.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_events(socket, chat).await {
                            tracing::debug!(peer = %peer, error = %e, "Connection error");
                        }
                        tracing::debug!(peer = %peer, "Connection closed");
                    });
                }
                Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
            },
        }
    }

    chat.broadcaster().closed().await;
    Ok(())
}

/// Post every stdin line as a chat message
async fn read_console(chat: ChatService) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let (id, text) = match line.split_once(": ") {
            Some((id, text)) => (id.to_string(), text.to_string()),
            None => ("console".to_string(), line),
        };

        match chat.post(id, text).await {
            Ok(_) => {}
            Err(chat_hub::Error::EmptyMessage) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Post rejected");
                break;
            }
        }
    }
}

/// Answer one HTTP request with an event stream
async fn serve_events(mut socket: TcpStream, chat: ChatService) -> std::io::Result<()> {
    socket.set_nodelay(true)?;

    // The request itself is irrelevant; drain its head
    let mut head = [0u8; 4096];
    let _ = socket.read(&mut head).await?;

    socket
        .write_all(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n",
                sse::CONTENT_TYPE
            )
            .as_bytes(),
        )
        .await?;

    let (history, mut sub) = match chat.connect().await {
        Ok(connected) => connected,
        Err(_) => return Ok(()),
    };

    let result = async {
        for message in &history {
            socket.write_all(&SseEvent::from_message(message).encode()).await?;
        }
        socket.write_all(&sse::keep_alive()).await?;
        socket.flush().await?;

        // The client never sends after its request, so a read only returns
        // once it hangs up
        let mut trailing = [0u8; 512];
        loop {
            tokio::select! {
                message = sub.recv() => match message {
                    Some(message) => {
                        socket.write_all(&SseEvent::from_message(&message).encode()).await?;
                        socket.flush().await?;
                    }
                    None => break,
                },
                read = socket.read(&mut trailing) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                },
            }
        }
        Ok::<(), std::io::Error>(())
    }
    .await;

    // Write failures end up here too; the broadcaster must forget us either way
    let _ = chat.disconnect(sub.id()).await;
    result
}
