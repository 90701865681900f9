use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::Mutex,
};
use tracing::{debug, error, info, warn};

use crate::{poller::RequestGate, stats_handler::StatsHandler};

type Writer = Arc<Mutex<Option<(u64, OwnedWriteHalf)>>>;

/// Longest partial line kept while waiting for its newline.
const MAX_PENDING_LINE_BYTES: usize = 4 * 1024 * 1024;

/// TCP connection to the Telemetry Source.
///
/// Requests go out as newline-delimited JSON on the write half; a background
/// task reads pushes off the read half and hands them to the [`StatsHandler`].
/// The connection is established lazily and re-established on the next
/// request after any failure.
pub struct UpstreamClient {
    address: String,
    writer: Writer,
    next_connection_id: AtomicU64,
    handler: Arc<StatsHandler>,
    gate: Arc<RequestGate>,
}

impl UpstreamClient {
    pub fn new(address: String, handler: Arc<StatsHandler>, gate: Arc<RequestGate>) -> Self {
        Self {
            address,
            writer: Arc::new(Mutex::new(None)),
            next_connection_id: AtomicU64::new(1),
            handler,
            gate,
        }
    }

    pub fn gate(&self) -> Arc<RequestGate> {
        self.gate.clone()
    }

    /// Send a request to the Telemetry Source.
    pub async fn send_request<T: Serialize>(&self, request: &T) -> Result<(), UpstreamError> {
        let json = serde_json::to_string(request)
            .map_err(|e| UpstreamError::SerializationError(e.to_string()))?;
        let message = format!("{}\n", json);

        match self.try_send(&message).await {
            Ok(_) => {
                debug!("Sent request to {}", self.address);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send request to {}: {}", self.address, e);
                Err(e)
            }
        }
    }

    async fn try_send(&self, message: &str) -> Result<(), UpstreamError> {
        let mut writer_guard = self.writer.lock().await;

        // Try to use existing connection first
        if let Some((_, ref mut writer)) = *writer_guard {
            match writer.write_all(message.as_bytes()).await {
                Ok(_) => {
                    if let Err(e) = writer.flush().await {
                        warn!("Flush failed, reconnecting: {}", e);
                        *writer_guard = None;
                    } else {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Write failed, reconnecting: {}", e);
                    *writer_guard = None;
                }
            }
        }

        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| UpstreamError::ConnectionError(e.to_string()))?;
        info!("Connected to telemetry source at {}", self.address);

        let (reader, mut writer) = stream.into_split();
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(read_pushes(
            reader,
            connection_id,
            self.address.clone(),
            self.writer.clone(),
            self.handler.clone(),
            self.gate.clone(),
        ));

        writer
            .write_all(message.as_bytes())
            .await
            .map_err(|e| UpstreamError::WriteError(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| UpstreamError::WriteError(e.to_string()))?;

        *writer_guard = Some((connection_id, writer));
        Ok(())
    }
}

/// Read newline-delimited pushes until the source closes the connection or
/// sends a line longer than [`MAX_PENDING_LINE_BYTES`].
async fn read_pushes(
    mut reader: OwnedReadHalf,
    connection_id: u64,
    address: String,
    writer: Writer,
    handler: Arc<StatsHandler>,
    gate: Arc<RequestGate>,
) {
    let mut buffer = vec![0u8; 8192];
    let mut leftover = Vec::new();

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                info!("Telemetry source at {} closed the connection", address);
                break;
            }
            Ok(n) => {
                leftover.extend_from_slice(&buffer[..n]);

                while let Some(newline_pos) = leftover.iter().position(|&b| b == b'\n') {
                    let line = &leftover[..newline_pos];

                    if !line.is_empty() {
                        if let Err(e) = handler.handle_message(line) {
                            error!("Error processing push from {}: {}", address, e);
                        }
                    }

                    leftover.drain(..=newline_pos);
                }

                if leftover.len() > MAX_PENDING_LINE_BYTES {
                    error!(
                        "Dropping connection to {}: {} bytes without a newline",
                        address,
                        leftover.len()
                    );
                    break;
                }
            }
            Err(e) => {
                error!("Error reading from {}: {}", address, e);
                break;
            }
        }
    }

    // Only drop the writer if it still belongs to this connection
    let mut writer_guard = writer.lock().await;
    if matches!(*writer_guard, Some((id, _)) if id == connection_id) {
        *writer_guard = None;
    }
    gate.complete();
}

#[derive(Debug)]
pub enum UpstreamError {
    ConnectionError(String),
    WriteError(String),
    SerializationError(String),
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamError::ConnectionError(e) => write!(f, "Connection error: {}", e),
            UpstreamError::WriteError(e) => write!(f, "Write error: {}", e),
            UpstreamError::SerializationError(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for UpstreamError {}
