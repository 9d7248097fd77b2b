//! TCP server: accept loop and per-connection handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::ipc::codec::{read_frame, write_json, WireRequest, WireResponse, MSG_REQUEST};
use crate::ipc::router;
use crate::tools::RepoContextServer;
use crate::types::ServerConfig;

/// Frame transport in front of a [`RepoContextServer`].
#[derive(Debug)]
pub struct IpcServer {
    server: Arc<RepoContextServer>,
    addr: SocketAddr,
    cancel: CancellationToken,
    config: ServerConfig,
}

impl IpcServer {
    pub fn new(server: Arc<RepoContextServer>, addr: SocketAddr, config: ServerConfig) -> Self {
        Self {
            server,
            addr,
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Token that stops the accept loop and every open connection.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind and serve until cancelled or a fatal error occurs.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_listener(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        let conn_semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        tracing::info!(
            "transport_listening: addr={}, max_connections={}",
            listener.local_addr()?,
            self.config.max_connections,
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("transport_shutdown: addr={}", self.addr);
                    break;
                }
                accept = listener.accept() => {
                    let (stream, peer) = accept?;

                    let permit = match conn_semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(
                                "connection_rejected: peer={}, max_connections={}",
                                peer,
                                self.config.max_connections,
                            );
                            drop(stream);
                            continue;
                        }
                    };

                    tracing::debug!(
                        "connection_accepted: peer={}, active={}",
                        peer,
                        self.config.max_connections - conn_semaphore.available_permits(),
                    );
                    let server = self.server.clone();
                    let cancel = self.cancel.child_token();
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, server, cancel, config, permit).await {
                            tracing::warn!("connection_failed: peer={}, error={}", peer, e);
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Decode, route and answer one request frame.
async fn respond(
    server: &RepoContextServer,
    msg_type: u8,
    payload: &[u8],
    cancel: &CancellationToken,
) -> WireResponse {
    if msg_type != MSG_REQUEST {
        return WireResponse::failure(
            "",
            "INVALID_ARGUMENT",
            format!("Unexpected message type: 0x{:02X}", msg_type),
        );
    }

    let request: WireRequest = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            return WireResponse::failure("", "INVALID_ARGUMENT", format!("Invalid JSON: {}", e))
        }
    };

    match router::route_request(server, &request.method, request.params, cancel).await {
        Ok(result) => WireResponse::success(request.id, result),
        Err(e) => {
            tracing::debug!("request_failed: method={}, code={}", request.method, e.code());
            WireResponse::failure(request.id, e.code(), e.to_string())
        }
    }
}

/// Handle a single TCP connection: read frames, route, write responses.
/// The connection's token is cancelled when the peer hangs up mid-call, which
/// stops any retry backoff still waiting for that call.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    server: Arc<RepoContextServer>,
    cancel: CancellationToken,
    config: ServerConfig,
    _permit: OwnedSemaphorePermit,
) -> std::io::Result<()> {
    let _guard = cancel.clone().drop_guard();
    let (mut reader, mut writer) = stream.into_split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame_result = tokio::time::timeout(config.read_timeout, read_frame(&mut reader, config.max_frame_bytes)) => {
                let (msg_type, payload) = match frame_result {
                    Err(_elapsed) => {
                        tracing::debug!("read_timeout: timeout_ms={}", config.read_timeout.as_millis());
                        break;
                    }
                    Ok(result) => match result? {
                        Some(frame) => frame,
                        None => break,
                    },
                };

                let response = tokio::select! {
                    response = respond(&server, msg_type, &payload, &cancel) => response,
                    _ = peer_closed(&mut reader) => {
                        tracing::debug!("peer_closed_during_call: msg_type=0x{:02X}", msg_type);
                        cancel.cancel();
                        break;
                    }
                };
                timed_write(&mut writer, &response, config.write_timeout).await?;
            }
        }
    }

    Ok(())
}

/// Resolves once the peer has closed its side. Pipelined bytes are only
/// peeked, never consumed, so the next frame read still sees them.
async fn peer_closed(reader: &mut OwnedReadHalf) {
    let mut buf = [0u8; 1];
    match reader.peek(&mut buf).await {
        Ok(0) | Err(_) => {}
        Ok(_) => std::future::pending::<()>().await,
    }
}

/// Write a response frame with a timeout so slow consumers cannot hold a
/// connection slot indefinitely.
async fn timed_write<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &WireResponse,
    timeout: Duration,
) -> std::io::Result<()> {
    tokio::time::timeout(timeout, write_json(writer, response.msg_type(), response))
        .await
        .map_err(|_| {
            tracing::warn!("write_timeout: timeout_ms={}", timeout.as_millis());
            std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout")
        })?
}
